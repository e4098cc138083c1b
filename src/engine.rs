use std::collections::VecDeque;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::actions::{ActionError, DbSettings, Handlers};
use slop_ast::{Action, ActionKind, Environment, PreconditionError, Program, check_preconditions};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid arguments: slop accepts at most one task, got {0} (usage: slop [task])")]
    TooManyArguments(usize),
    #[error("invalid arguments: task '{name}' is not declared, allowed tasks are: '{available}'")]
    UnknownTask { name: String, available: String },
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("line {line}: task '{name}' is not declared")]
    UndefinedTask { name: String, line: usize },
    #[error("line {line}: cyclic task reference: {chain}")]
    CyclicTask { chain: String, line: usize },
    #[error("line {line}: action not implemented: {kind}")]
    NotImplemented { kind: ActionKind, line: usize },
    #[error("{kind}: line {line}: {source}")]
    Action {
        kind: ActionKind,
        line: usize,
        #[source]
        source: ActionError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { actions: usize },
    /// the selected queue had nothing in it
    NothingToRun,
}

/// Entry of the work queue
#[derive(Debug)]
enum Work {
    Run(Action),
    /// end of an expanded task body
    Leave,
}

pub struct Engine {
    program: Program,
    handlers: Handlers,
}

impl Engine {
    pub fn new(program: Program, handlers: Handlers) -> Self {
        Engine { program, handlers }
    }

    /// Run the default queue, or the task named by the single argument.
    ///
    /// Actions run one at a time in queue order and the first failure stops
    /// the run; completed actions are not undone. Every task call in the
    /// program is checked against the declared tasks before anything runs.
    pub async fn run(
        &mut self,
        args: &[String],
        env: &dyn Environment,
    ) -> Result<RunOutcome, EngineError> {
        let selected = self.select(args)?;
        self.check_task_calls()?;
        self.program.completed = 0;

        let mut work: VecDeque<Work> = VecDeque::new();
        let mut active: Vec<String> = Vec::new();
        // default-queue actions not yet scheduled; the first task call
        // moves them into the work queue
        let mut pending: Vec<Action> = Vec::new();
        match selected {
            Some(task) => {
                info!(task = %task, "running task");
                let body = self.program.task(&task).unwrap_or_default();
                work.extend(body.iter().cloned().map(Work::Run));
                work.push_back(Work::Leave);
                active.push(task);
                pending = self.program.default_queue.clone();
            }
            None => {
                work.extend(self.program.default_queue.iter().cloned().map(Work::Run));
            }
        }

        while let Some(item) = work.pop_front() {
            let action = match item {
                Work::Run(action) => action,
                Work::Leave => {
                    active.pop();
                    continue;
                }
            };

            if let Err(e) = check_preconditions(action.kind, &self.program.config, env) {
                debug!(action = %action, line = action.line, error = %e, "precondition failed");
                return Err(e.into());
            }

            match action.kind {
                ActionKind::Task => self.expand(&action, &mut work, &mut active, &mut pending)?,
                _ => self.dispatch(&action, env).await?,
            }
            self.program.completed += 1;
        }

        if self.program.completed == 0 {
            return Ok(RunOutcome::NothingToRun);
        }
        Ok(RunOutcome::Completed {
            actions: self.program.completed,
        })
    }

    fn select(&self, args: &[String]) -> Result<Option<String>, EngineError> {
        match args {
            [] => Ok(None),
            [name] if self.program.tasks.contains_key(name) => Ok(Some(name.clone())),
            [name] => Err(EngineError::UnknownTask {
                name: name.clone(),
                available: self.program.task_names().join(", "),
            }),
            _ => Err(EngineError::TooManyArguments(args.len())),
        }
    }

    /// Every `task` action, reachable or not, must name a declared task
    fn check_task_calls(&self) -> Result<(), EngineError> {
        let calls = self
            .program
            .default_queue
            .iter()
            .chain(self.program.tasks.values().flatten())
            .filter(|action| action.kind == ActionKind::Task);

        for call in calls {
            if !self.program.tasks.contains_key(&call.argument) {
                return Err(EngineError::UndefinedTask {
                    name: call.argument.clone(),
                    line: call.line,
                });
            }
        }
        Ok(())
    }

    /// Put the called task's body at the front of the work queue, followed
    /// by the default-queue actions that have not been scheduled yet, then
    /// whatever was already waiting.
    fn expand(
        &self,
        call: &Action,
        work: &mut VecDeque<Work>,
        active: &mut Vec<String>,
        pending: &mut Vec<Action>,
    ) -> Result<(), EngineError> {
        let name = &call.argument;
        let body = self
            .program
            .task(name)
            .ok_or_else(|| EngineError::UndefinedTask {
                name: name.clone(),
                line: call.line,
            })?;

        if active.contains(name) {
            let mut chain = active.clone();
            chain.push(name.clone());
            return Err(EngineError::CyclicTask {
                chain: chain.join(" -> "),
                line: call.line,
            });
        }

        info!(task = %name, actions = body.len(), "expanding task");
        for action in pending.drain(..).rev() {
            work.push_front(Work::Run(action));
        }
        work.push_front(Work::Leave);
        for action in body.iter().rev() {
            work.push_front(Work::Run(action.clone()));
        }
        active.push(name.clone());
        Ok(())
    }

    async fn dispatch(&self, action: &Action, env: &dyn Environment) -> Result<(), EngineError> {
        let handler = self
            .handlers
            .get(action.kind)
            .ok_or(EngineError::NotImplemented {
                kind: action.kind,
                line: action.line,
            })?;
        let db = DbSettings::resolve(&self.program.config, env);

        info!(
            action = %action,
            line = action.line,
            progress = "start",
            "running action"
        );
        let start = Instant::now();

        match handler.execute(action, &db).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    action = %action,
                    progress = "done",
                    duration_ms,
                    "action succeeded"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    action = %action,
                    progress = "failed",
                    error = %e,
                    "action failed"
                );
                Err(EngineError::Action {
                    kind: action.kind,
                    line: action.line,
                    source: e,
                })
            }
        }
    }
}
