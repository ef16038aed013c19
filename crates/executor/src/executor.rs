//! The Executor - runs plans against a session context.
//!
//! The Executor is a stateless dispatcher. A plan moves through
//! `Received -> Classified -> {Unwrapped | Transactional} -> Completed | Failed`:
//!
//! - a read-only plan runs every command directly; failures are reported per
//!   command and siblings still run
//! - a mutating plan runs inside one undo group; the first failure cancels
//!   the group, undoes the local index bookkeeping, restores the result
//!   cache and skips the remaining commands

use bridge_core::ResultSet;
use tracing::{debug, error, info, warn};

use crate::bridge::Remote;
use crate::classify::classify;
use crate::convert::convert_result;
use crate::handlers;
use crate::outcome::{PlanFailure, PlanOutcome, PlanStatus, RollbackStatus, StepReport};
use crate::{Command, Error, Output, Plan, Result, SessionContext};

/// The plan executor.
///
/// The Executor is **stateless**: the path index, the result cache and the
/// session handle all live in the [`SessionContext`] it is given.
///
/// # Example
///
/// ```ignore
/// use bridge_executor::{Command, Executor, Plan, Selector};
///
/// let outcome = Executor::new().execute(&mut ctx, Plan::new(vec![
///     Command::CreateObjects {
///         parent: Selector::path("\\Actor-Mixer Hierarchy\\Default Work Unit")?,
///         names: vec!["Foo".into()],
///         object_types: vec!["ActorMixer".into()],
///     },
///     Command::RenameObjects {
///         targets: Selector::Previous,
///         new_names: vec!["Bar".into()],
///     },
/// ]))?;
/// assert!(outcome.is_success());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Create a new executor.
    pub fn new() -> Self {
        Executor
    }

    /// Execute a plan.
    ///
    /// Command failures never escape as `Err`: they are part of the
    /// returned [`PlanOutcome`].
    ///
    /// # Errors
    ///
    /// - `NotConnected` if the session is closed
    /// - `TransactionAlreadyActive`, `Connection` or `Timeout` if the undo
    ///   group cannot be opened
    /// - `RollbackFailed` if a failed plan could not be cancelled; the remote
    ///   project may then hold partial changes, the index is invalidated
    ///   and the result cache cleared
    pub fn execute(&self, ctx: &mut SessionContext, plan: Plan) -> Result<PlanOutcome> {
        if !ctx.is_connected() {
            return Err(Error::NotConnected);
        }
        ctx.absorb_external_changes();

        let verdict = classify(&plan);
        debug!(
            target: "bridge::plan",
            commands = plan.len(),
            mutating = verdict.mutating,
            "Classified plan"
        );

        let result = if verdict.mutating {
            self.run_transactional(ctx, plan)
        } else {
            self.run_unwrapped(ctx, plan)
        };
        ctx.settle_change_events();
        result
    }

    // =========================================================================
    // Unwrapped execution
    // =========================================================================

    fn run_unwrapped(&self, ctx: &mut SessionContext, plan: Plan) -> Result<PlanOutcome> {
        let reuse_previous = plan.reuse_previous;
        let mut steps = Vec::with_capacity(plan.len());
        let mut failure = None;
        let mut result_set = None;

        for (index, command) in plan.commands.into_iter().enumerate() {
            let name = command.name();
            let result = run_command(ctx, command, reuse_previous);
            let fatal = match &result {
                Ok(output) => {
                    remember(ctx, output, &mut result_set);
                    false
                }
                Err(e) => {
                    debug!(target: "bridge::plan", index, command = name, error = %e, "Command failed");
                    if failure.is_none() {
                        failure = Some(PlanFailure {
                            index,
                            command: name.to_string(),
                            error: e.clone(),
                            rollback: RollbackStatus::NotRequired,
                        });
                    }
                    e.is_fatal()
                }
            };
            steps.push(StepReport {
                index,
                command: name.to_string(),
                result,
            });
            if fatal {
                break;
            }
        }

        Ok(PlanOutcome {
            status: if failure.is_some() {
                PlanStatus::Failed
            } else {
                PlanStatus::Success
            },
            transactional: false,
            steps,
            failure,
            result_set,
        })
    }

    // =========================================================================
    // Transactional execution
    // =========================================================================

    fn run_transactional(&self, ctx: &mut SessionContext, plan: Plan) -> Result<PlanOutcome> {
        let reuse_previous = plan.reuse_previous;
        let total = plan.len();
        let cache_snapshot = ctx.cache().snapshot();

        convert_result(ctx.session_mut()?.begin_transaction())?;
        ctx.index_mut().begin_journal();
        debug!(target: "bridge::txn", commands = total, "Opened undo group");

        let mut steps = Vec::with_capacity(total);
        let mut result_set = None;

        for (index, command) in plan.commands.into_iter().enumerate() {
            let name = command.name();
            debug!(target: "bridge::txn", index, command = name, "Running command");
            match run_command(ctx, command, reuse_previous) {
                Ok(output) => {
                    remember(ctx, &output, &mut result_set);
                    steps.push(StepReport {
                        index,
                        command: name.to_string(),
                        result: Ok(output),
                    });
                }
                Err(e) => {
                    warn!(target: "bridge::txn", index, command = name, error = %e, "Command failed, cancelling undo group");
                    steps.push(StepReport {
                        index,
                        command: name.to_string(),
                        result: Err(e.clone()),
                    });
                    return rollback(ctx, cache_snapshot, steps, index, name, e);
                }
            }
        }

        let label = ctx.config().transaction_label.clone();
        if let Err(e) = ctx.session_mut().and_then(|s| convert_result(s.commit_transaction(&label))) {
            warn!(target: "bridge::txn", error = %e, "Commit failed, cancelling undo group");
            return rollback(ctx, cache_snapshot, steps, total, "Commit", e);
        }
        ctx.index_mut().commit_journal();
        info!(target: "bridge::txn", commands = total, label = %label, "Committed undo group");

        Ok(PlanOutcome {
            status: PlanStatus::Success,
            transactional: true,
            steps,
            failure: None,
            result_set,
        })
    }
}

/// Cancel the open undo group after the command at `index` failed.
fn rollback(
    ctx: &mut SessionContext,
    cache_snapshot: Option<ResultSet>,
    steps: Vec<StepReport>,
    index: usize,
    command: &str,
    cause: Error,
) -> Result<PlanOutcome> {
    match ctx.session_mut().and_then(|s| convert_result(s.cancel_transaction())) {
        Ok(()) => {
            let undone = ctx.index_mut().rollback_journal();
            ctx.cache_mut().restore(cache_snapshot);
            info!(target: "bridge::txn", index, undone, "Cancelled undo group");
            Ok(PlanOutcome {
                status: PlanStatus::Failed,
                transactional: true,
                steps,
                failure: Some(PlanFailure {
                    index,
                    command: command.to_string(),
                    error: cause,
                    rollback: RollbackStatus::RolledBack,
                }),
                result_set: None,
            })
        }
        Err(e) => {
            error!(
                target: "bridge::txn",
                index,
                command,
                cause = %cause,
                error = %e,
                "Rollback failed, remote project may hold partial changes"
            );
            let index_state = ctx.index_mut();
            index_state.commit_journal();
            index_state.invalidate_all();
            ctx.cache_mut().clear();
            Err(Error::RollbackFailed {
                failed_command: index,
                cause: cause.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Run one command against a freshly borrowed [`Remote`].
fn run_command(ctx: &mut SessionContext, command: Command, reuse_previous: bool) -> Result<Output> {
    let mut remote = ctx.remote(reuse_previous)?;
    dispatch(&mut remote, command)
}

/// Cache what a successful command produced.
fn remember(ctx: &mut SessionContext, output: &Output, result_set: &mut Option<ResultSet>) {
    if let Some(produced) = output.produced() {
        ctx.cache_mut().set(produced.clone());
        *result_set = Some(produced);
    }
}

fn dispatch(r: &mut Remote<'_>, command: Command) -> Result<Output> {
    match command {
        // Authoring
        Command::CreateObjects {
            parent,
            names,
            object_types,
        } => handlers::objects::create_objects(r, parent, names, object_types),
        Command::CreateEvents {
            targets,
            names,
            actions,
            parents,
        } => handlers::events::create_events(r, targets, names, actions, parents),
        Command::CreateGameParameters { parameters, parent } => {
            handlers::gamesyncs::create_game_parameters(r, parameters, parent)
        }
        Command::CreateGameSyncs {
            kind,
            parent,
            names,
        } => handlers::gamesyncs::create_game_syncs(r, kind, parent, names),
        Command::RenameObjects { targets, new_names } => {
            handlers::objects::rename_objects(r, targets, new_names)
        }
        Command::MoveObject {
            targets,
            new_parent,
        } => handlers::objects::move_object(r, targets, new_parent),
        Command::SetProperty {
            targets,
            property,
            value,
        } => handlers::objects::set_property(r, targets, property, value),
        Command::ImportAudio {
            items,
            object_type,
            language,
            operation,
        } => handlers::objects::import_audio(r, items, object_type, language, operation),

        // Soundbanks
        Command::IncludeInSoundbank {
            soundbank,
            targets,
            filter,
        } => handlers::soundbank::include_in_soundbank(r, soundbank, targets, filter),
        Command::GenerateSoundbanks {
            soundbanks,
            platforms,
            languages,
        } => handlers::soundbank::generate_soundbanks(r, soundbanks, platforms, languages),

        // Runtime
        Command::RegisterGameObjects { names, positions } => {
            handlers::runtime::register_game_objects(r, names, positions)
        }
        Command::UnregisterGameObject { name } => {
            handlers::runtime::unregister_game_object(r, name)
        }
        Command::PostEvent {
            event,
            game_object,
            delay_ms,
        } => handlers::runtime::post_event(r, event, game_object, delay_ms),
        Command::SetRtpc {
            rtpc,
            from,
            to,
            duration_ms,
            game_object,
        } => handlers::runtime::set_rtpc(r, rtpc, from, to, duration_ms, game_object),
        Command::SetSwitch {
            switch_group,
            switch,
            game_object,
        } => handlers::runtime::set_switch(r, switch_group, switch, game_object),
        Command::SetState { state_group, state } => {
            handlers::runtime::set_state(r, state_group, state)
        }
        Command::MoveGameObject {
            game_object,
            from,
            to,
            duration_ms,
            front,
            top,
        } => handlers::runtime::move_game_object(r, game_object, from, to, duration_ms, front, top),
        Command::StopAllSounds { game_object } => {
            handlers::runtime::stop_all_sounds(r, game_object)
        }

        // Index
        Command::IndexSubtree { root, extend } => handlers::index::index_subtree(r, root, extend),
        Command::ResolvePaths { paths } => handlers::index::resolve_paths(r, paths),

        // Queries
        Command::ListEvents { filter } => handlers::query::list_events(r, filter),
        Command::ListGameParameters { filter } => {
            handlers::gamesyncs::list_game_parameters(r, filter)
        }
        Command::ListSwitchGroups { filter } => handlers::gamesyncs::list_switch_groups(r, filter),
        Command::ListStateGroups { filter } => handlers::gamesyncs::list_state_groups(r, filter),
        Command::ListGameObjects => handlers::runtime::list_game_objects(r),
        Command::GetSelection => handlers::query::get_selection(r),
        Command::GetProjectInfo => handlers::query::get_project_info(r),
        Command::ListProperties => handlers::query::list_properties(),

        // Subscriptions
        Command::Subscribe { topic } => handlers::subscription::subscribe(r, topic),
        Command::Unsubscribe { id } => handlers::subscription::unsubscribe(r, id),
        Command::PollEvents { id, max } => handlers::subscription::poll_events(r, id, max),
    }
}
