// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent loop and bridge engine: the iteration planner, the subprocess
//! executor with double-tap interrupt discipline, startup collaborators,
//! the top-level agent loop, the bridge poller/classifier, and the shared
//! command handlers both front-ends dispatch to.

pub mod agent_loop;
pub mod bridge;
pub mod collaborators;
pub mod commands;
pub mod executor;
pub mod planner;

pub use agent_loop::{AgentLoop, AgentLoopError, ExitReason, LoopDeps};
pub use bridge::{classify, BridgeError, BridgePoller, Classification};
pub use collaborators::{
    AutoMergeAction, AutoMergeChecker, CollaboratorError, FakeAutoMergeChecker,
    FakeRecurringInjector, FakeRitualRunner, FakeSkillDispatcher, InstanceCommitter,
    NoOpAutoMergeChecker, NoOpInstanceCommitter, NoOpProjectGitSync, NoOpRecurringInjector,
    NoOpRitualRunner, PhraseQuotaDetector, ProcessRitualRunner, ProcessSkillDispatcher,
    ProjectGitSync, QuotaDetector, RecurringInjector, RitualRunner, SkillDispatcher,
    SkillResult, StartupCollaborator,
};

#[cfg(any(test, feature = "test-support"))]
pub use collaborators::{FakeInstanceCommitter, FakeProjectGitSync, FakeQuotaDetector};
pub use commands::{handle_command, CommandOutcome};
pub use executor::{ExecutorError, ProtectedPhase, SignalState, WorkerExecutor};
pub use planner::{plan_iteration, PlanAction, PlanContext, PlanOutput};
