//! The `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else`/`#endif` stack. Each nested
//! conditional group tracks whether its current branch is active, whether
//! any branch in the group has already been taken (so a later `#elif`/
//! `#else` is skipped even if its own condition would hold), and whether
//! the group was reached while already inside a skipped outer group (so an
//! inner `#if` doesn't have to actually evaluate its condition).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// Currently taking tokens from this branch.
    Active,
    /// A previous branch in this group was taken; this one and any
    /// following `#elif`/`#else` are skipped.
    AlreadyTaken,
    /// Nothing in this group has been taken yet; still looking for one
    /// whose condition holds.
    NotYetTaken,
}

struct Group {
    branch: Branch,
    saw_else: bool,
    /// True if an enclosing group is itself inactive, in which case this
    /// group's own condition is never evaluated.
    parent_inactive: bool,
}

#[derive(Default)]
pub struct ConditionalStack {
    groups: Vec<Group>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// True if tokens at the current nesting level should be passed through
    /// to the rest of the preprocessor.
    pub fn is_active(&self) -> bool {
        self.groups.last().map_or(true, |g| !g.parent_inactive && g.branch == Branch::Active)
    }

    fn currently_inactive(&self) -> bool {
        self.groups.last().map_or(false, |g| g.parent_inactive || g.branch != Branch::Active)
    }

    /// Whether an `#elif`/`#elifdef`/`#elifndef`'s controlling expression
    /// should actually be evaluated: only when no earlier branch in this
    /// group has matched yet and the group itself isn't nested inside a
    /// dead one. Once a branch has matched, later siblings' conditions are
    /// never evaluated, even if their tokens would be ill-formed.
    pub fn should_evaluate_elif(&self) -> bool {
        self.groups.last().map_or(false, |g| !g.parent_inactive && g.branch == Branch::NotYetTaken)
    }

    /// `#if`/`#ifdef`/`#ifndef`: `condition` is `None` when this group is
    /// nested inside an already-skipped group (the condition must not be
    /// evaluated, since macros it references may not even be well-formed).
    pub fn push_if(&mut self, condition: Option<bool>) {
        let parent_inactive = self.currently_inactive();
        let branch = if parent_inactive {
            Branch::NotYetTaken
        } else if condition == Some(true) {
            Branch::Active
        } else {
            Branch::NotYetTaken
        };
        self.groups.push(Group { branch, saw_else: false, parent_inactive });
    }

    pub fn push_elif(&mut self, condition: Option<bool>) -> Result<(), CondError> {
        let group = self.groups.last_mut().ok_or(CondError::NoMatchingIf)?;
        if group.saw_else {
            return Err(CondError::ElifAfterElse);
        }
        group.branch = match group.branch {
            Branch::Active => Branch::AlreadyTaken,
            Branch::AlreadyTaken => Branch::AlreadyTaken,
            Branch::NotYetTaken => {
                if !group.parent_inactive && condition == Some(true) {
                    Branch::Active
                } else {
                    Branch::NotYetTaken
                }
            }
        };
        Ok(())
    }

    pub fn push_else(&mut self) -> Result<(), CondError> {
        let group = self.groups.last_mut().ok_or(CondError::NoMatchingIf)?;
        if group.saw_else {
            return Err(CondError::DuplicateElse);
        }
        group.saw_else = true;
        group.branch = match group.branch {
            Branch::Active => Branch::AlreadyTaken,
            Branch::AlreadyTaken => Branch::AlreadyTaken,
            Branch::NotYetTaken => {
                if group.parent_inactive {
                    Branch::NotYetTaken
                } else {
                    Branch::Active
                }
            }
        };
        Ok(())
    }

    pub fn pop_endif(&mut self) -> Result<(), CondError> {
        self.groups.pop().map(|_| ()).ok_or(CondError::NoMatchingIf)
    }

    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Any groups still open when the file ends are unterminated.
    pub fn is_balanced(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondError {
    NoMatchingIf,
    ElifAfterElse,
    DuplicateElse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_if_true_is_active() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(true));
        assert!(stack.is_active());
        stack.pop_endif().unwrap();
        assert!(stack.is_balanced());
    }

    #[test]
    fn false_if_then_else_activates_else() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(false));
        assert!(!stack.is_active());
        stack.push_else().unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn elif_after_taken_branch_stays_skipped() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(true));
        stack.push_elif(Some(true)).unwrap();
        assert!(!stack.is_active());
    }

    #[test]
    fn nested_group_inside_skipped_outer_never_activates() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(false));
        stack.push_if(None);
        assert!(!stack.is_active());
        stack.push_else().unwrap();
        assert!(!stack.is_active());
    }

    #[test]
    fn else_after_else_is_rejected() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(false));
        stack.push_else().unwrap();
        assert_eq!(stack.push_else(), Err(CondError::DuplicateElse));
    }

    #[test]
    fn endif_without_if_is_rejected() {
        let mut stack = ConditionalStack::new();
        assert_eq!(stack.pop_endif(), Err(CondError::NoMatchingIf));
    }

    #[test]
    fn elif_after_taken_branch_is_not_evaluated() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(true));
        assert!(!stack.should_evaluate_elif());
    }

    #[test]
    fn elif_still_looking_is_evaluated() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(false));
        assert!(stack.should_evaluate_elif());
    }

    #[test]
    fn elif_inside_dead_outer_is_not_evaluated() {
        let mut stack = ConditionalStack::new();
        stack.push_if(Some(false));
        stack.push_if(None);
        assert!(!stack.should_evaluate_elif());
    }
}
