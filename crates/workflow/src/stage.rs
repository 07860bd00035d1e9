use std::fmt;

/// Position in the guided creation workflow. Linear, terminal at
/// `CreatedKeyResultTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowStage {
    #[default]
    None,
    CreatedSession,
    CreatedObjective,
    CreatedKeyResult,
    CreatedKeyResultTask,
}

impl WorkflowStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::CreatedSession => "CreatedSession",
            Self::CreatedObjective => "CreatedObjective",
            Self::CreatedKeyResult => "CreatedKeyResult",
            Self::CreatedKeyResultTask => "CreatedKeyResultTask",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "None" => Some(Self::None),
            "CreatedSession" => Some(Self::CreatedSession),
            "CreatedObjective" => Some(Self::CreatedObjective),
            "CreatedKeyResult" => Some(Self::CreatedKeyResult),
            "CreatedKeyResultTask" => Some(Self::CreatedKeyResultTask),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CreatedKeyResultTask)
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
