//! Constraint conflict detection and reporting.

use std::fmt;

/// A report of every contradiction found while merging matched constraints.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<ConstraintConflict>,
}

/// Two sets of requirements on the same dependency that cannot both hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintConflict {
    pub dependency: String,
    /// The requirement accumulated from earlier rules.
    pub existing: String,
    /// The requirement of the rule that could not be merged.
    pub incoming: String,
    /// Indices of every rule involved, in declaration order.
    pub rules: Vec<usize>,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: ConstraintConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No constraint conflicts.");
        }
        writeln!(f, "Constraint conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConstraintConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(|r| format!("#{r}")).collect();
        write!(
            f,
            "{}: {} vs {} ({}; rules {})",
            self.dependency,
            self.existing,
            self.incoming,
            self.reason,
            rules.join(", ")
        )
    }
}
