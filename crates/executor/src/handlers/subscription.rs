//! Subscription handlers.
//!
//! Subscriptions opened here belong to the caller and are kept apart from
//! the structural watchers the session context uses for index upkeep.

use bridge_session::SubscriptionId;
use serde_json::json;

use crate::bridge::Remote;
use crate::convert::convert_result;
use crate::{Error, Output, Result};

/// Handle Subscribe command.
pub fn subscribe(r: &mut Remote<'_>, topic: String) -> Result<Output> {
    if topic.trim().is_empty() {
        return Err(Error::invalid_input("topic must not be empty"));
    }
    let subscription = convert_result(r.session.subscribe(&topic, json!({})))?;
    let id = subscription.id();
    r.subscriptions.insert(id, subscription);
    Ok(Output::Subscribed { id, topic })
}

/// Handle Unsubscribe command.
pub fn unsubscribe(r: &mut Remote<'_>, id: SubscriptionId) -> Result<Output> {
    if r.subscriptions.remove(&id).is_none() {
        return Err(Error::SubscriptionNotFound { id: id.to_string() });
    }
    let removed = convert_result(r.session.unsubscribe(id))?;
    Ok(Output::Bool(removed))
}

/// Handle PollEvents command.
pub fn poll_events(r: &mut Remote<'_>, id: Option<SubscriptionId>, max: Option<usize>) -> Result<Output> {
    let max = max.unwrap_or(usize::MAX);
    let events = match id {
        Some(id) => r
            .subscriptions
            .get(&id)
            .ok_or_else(|| Error::SubscriptionNotFound { id: id.to_string() })?
            .drain(max),
        None => {
            let mut events = Vec::new();
            for subscription in r.subscriptions.values() {
                if events.len() >= max {
                    break;
                }
                events.extend(subscription.drain(max - events.len()));
            }
            events
        }
    };
    Ok(Output::ChangeEvents(events))
}
