//! [`CommandArbiter`] – ordered rule table that picks the tick's command.
//!
//! Each [`ArbitrationRule`] inspects the tick's [`Signals`] and either claims
//! the tick with a command or passes.  Rules are evaluated in insertion order
//! and the first claim wins; when every rule passes the arbiter falls back to
//! [`FALLBACK_COMMAND`].
//!
//! [`CommandArbiter::standard`] installs the production precedence:
//!
//! | # | Rule | Claims when | Command |
//! |---|------|-------------|---------|
//! | 1 | [`SafetyStopRule`] | safety override is `Stop` | `Stop` |
//! | 2 | [`LateralCorrectionRule`] | a correction step is pending | the step |
//! | 3 | [`SafetyDecelerateRule`] | override is `Decelerate` and navigation is not a turn | `Decelerate` |
//! | 4 | [`NavigationRule`] | navigation produced a command | that command |
//!
//! # Example
//!
//! ```
//! use lanesweep_nav::arbiter::{CommandArbiter, Signals};
//! use lanesweep_types::Command;
//!
//! let arbiter = CommandArbiter::standard();
//!
//! // A turn outranks deceleration ...
//! let turning = Signals {
//!     safety_override: Some(Command::Decelerate),
//!     correction: None,
//!     navigation: Some(Command::TurnLeft180),
//! };
//! assert_eq!(arbiter.arbitrate(&turning), Command::TurnLeft180);
//!
//! // ... but nothing outranks a stop.
//! let stopping = Signals { safety_override: Some(Command::Stop), ..turning };
//! assert_eq!(arbiter.arbitrate(&stopping), Command::Stop);
//! ```

use lanesweep_types::Command;
use tracing::trace;

/// Command returned when no rule claims the tick.
pub const FALLBACK_COMMAND: Command = Command::Forward;

/// Everything the classifiers produced for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// `Stop` or `Decelerate` from the safety classifier.
    pub safety_override: Option<Command>,
    /// Step from the lateral controller.
    pub correction: Option<Command>,
    /// Command from the turn sequencer; `None` when it was not consulted.
    pub navigation: Option<Command>,
}

/// One row of the arbitration table.
pub trait ArbitrationRule: Send + Sync {
    /// Name reported in traces.
    fn name(&self) -> &str;

    /// Return `Some(command)` to claim the tick, `None` to pass.
    fn decide(&self, signals: &Signals) -> Option<Command>;
}

/// Ordered list of [`ArbitrationRule`]s.
#[derive(Default)]
pub struct CommandArbiter {
    rules: Vec<Box<dyn ArbitrationRule>>,
}

impl CommandArbiter {
    /// An arbiter with no rules; every tick resolves to [`FALLBACK_COMMAND`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The production precedence table.
    pub fn standard() -> Self {
        let mut arbiter = Self::new();
        arbiter.add_rule(Box::new(SafetyStopRule));
        arbiter.add_rule(Box::new(LateralCorrectionRule));
        arbiter.add_rule(Box::new(SafetyDecelerateRule));
        arbiter.add_rule(Box::new(NavigationRule));
        arbiter
    }

    /// Append a rule.  It is consulted after every rule already present.
    pub fn add_rule(&mut self, rule: Box<dyn ArbitrationRule>) {
        self.rules.push(rule);
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Resolve `signals` to exactly one command.
    pub fn arbitrate(&self, signals: &Signals) -> Command {
        for rule in &self.rules {
            if let Some(command) = rule.decide(signals) {
                trace!(rule = rule.name(), command = %command, "arbitration");
                return command;
            }
        }
        FALLBACK_COMMAND
    }
}

impl std::fmt::Debug for CommandArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandArbiter")
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// Perimeter critical: stop, unconditionally.
pub struct SafetyStopRule;

impl ArbitrationRule for SafetyStopRule {
    fn name(&self) -> &str {
        "safety_stop"
    }

    fn decide(&self, signals: &Signals) -> Option<Command> {
        (signals.safety_override == Some(Command::Stop)).then_some(Command::Stop)
    }
}

/// Pending lateral correction.
pub struct LateralCorrectionRule;

impl ArbitrationRule for LateralCorrectionRule {
    fn name(&self) -> &str {
        "lateral_correction"
    }

    fn decide(&self, signals: &Signals) -> Option<Command> {
        signals.correction
    }
}

/// Perimeter close: decelerate unless a 180° turn is under way.
pub struct SafetyDecelerateRule;

impl ArbitrationRule for SafetyDecelerateRule {
    fn name(&self) -> &str {
        "safety_decelerate"
    }

    fn decide(&self, signals: &Signals) -> Option<Command> {
        let turning = signals.navigation.is_some_and(Command::is_turn);
        (signals.safety_override == Some(Command::Decelerate) && !turning)
            .then_some(Command::Decelerate)
    }
}

/// Whatever the turn sequencer decided.
pub struct NavigationRule;

impl ArbitrationRule for NavigationRule {
    fn name(&self) -> &str {
        "navigation"
    }

    fn decide(&self, signals: &Signals) -> Option<Command> {
        signals.navigation
    }
}
