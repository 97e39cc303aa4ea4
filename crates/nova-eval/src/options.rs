/// What an evaluation is for.
///
/// Conditions, watches and hovers run implicitly every time the thread stops,
/// so they must leave the debuggee as they found it. Only an expression the
/// user explicitly submits may change debuggee state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    /// Breakpoint condition or hit-count expression.
    Condition,
    Watch,
    Hover,
    /// Expression typed into the debug console.
    Repl,
}

impl EvalKind {
    pub fn may_have_side_effects(self) -> bool {
        matches!(self, EvalKind::Repl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Whether `Construct`, `Invoke` and writes may run.
    pub allow_side_effects: bool,
}

impl EvalOptions {
    pub fn for_kind(kind: EvalKind) -> Self {
        Self {
            allow_side_effects: kind.may_have_side_effects(),
        }
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self::for_kind(EvalKind::Repl)
    }
}
