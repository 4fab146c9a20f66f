//! Linearizes a stage's live steps into one execution order.
//!
//! Steps are first laid out by registration slot, then split stably into
//! three groups: `before = *`, unconstrained by wildcards, and `after = *`.
//! Each step is then placed after everything it must follow, visiting
//! predecessors depth first. A predecessor sitting in a later group, a cycle,
//! or a self reference is a [`Conflict`].

use std::collections::{HashMap, HashSet};

use crate::registry::Candidate;
use crate::step::{Action, Anchor, Conflict, Constraint, DuplicateStep};

/// Result of a successful compilation.
#[derive(Clone)]
pub(crate) struct Compiled {
    pub actions: Vec<Action>,
    pub order: Vec<String>,
    pub duplicates: Vec<DuplicateStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Group {
    First,
    Middle,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Placed,
}

/// `pred` must run before the step being visited. The edge is declared by
/// `owner` through `constraint`.
struct Edge {
    pred: usize,
    owner: usize,
    constraint: Constraint,
}

pub(crate) fn compile(mut candidates: Vec<Candidate<'_>>) -> Result<Compiled, Conflict> {
    candidates.sort_by_key(|c| c.slot);
    let duplicates = find_duplicates(&candidates);

    let mut grouped = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        check_self_reference(&candidate)?;
        grouped.push((group_of(&candidate)?, candidate));
    }
    grouped.sort_by_key(|(group, _)| *group);

    let (groups, candidates): (Vec<Group>, Vec<Candidate<'_>>) = grouped.into_iter().unzip();
    let mut sorter = Sorter::new(&candidates, groups);
    for idx in 0..candidates.len() {
        sorter.visit(idx)?;
    }

    let mut actions = Vec::with_capacity(sorter.sorted.len());
    let mut order = Vec::with_capacity(sorter.sorted.len());
    for &idx in &sorter.sorted {
        let step = candidates[idx].step;
        if let Some(action) = &step.action {
            actions.push(action.clone());
            order.push(step.name.clone());
        }
    }

    Ok(Compiled {
        actions,
        order,
        duplicates,
    })
}

fn find_duplicates(candidates: &[Candidate<'_>]) -> Vec<DuplicateStep> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| !seen.insert(c.name()) && !c.step.replacing)
        .map(|c| DuplicateStep {
            name: c.name().to_string(),
            location: c.step.location,
        })
        .collect()
}

fn check_self_reference(candidate: &Candidate<'_>) -> Result<(), Conflict> {
    let name = candidate.name();
    let conflict = |constraint| Conflict {
        step: name.to_string(),
        constraint,
    };
    if let Some(anchor) = candidate.before {
        if anchor.step_name() == Some(name) {
            return Err(conflict(Constraint::Before(anchor.clone())));
        }
    }
    if let Some(anchor) = candidate.after {
        if anchor.step_name() == Some(name) {
            return Err(conflict(Constraint::After(anchor.clone())));
        }
    }
    Ok(())
}

fn group_of(candidate: &Candidate<'_>) -> Result<Group, Conflict> {
    match (candidate.before, candidate.after) {
        (Some(Anchor::All), Some(Anchor::All)) => Err(Conflict {
            step: candidate.name().to_string(),
            constraint: Constraint::After(Anchor::All),
        }),
        (Some(Anchor::All), _) => Ok(Group::First),
        (_, Some(Anchor::All)) => Ok(Group::Last),
        _ => Ok(Group::Middle),
    }
}

struct Sorter<'c, 'r> {
    candidates: &'c [Candidate<'r>],
    groups: Vec<Group>,
    by_name: HashMap<&'r str, Vec<usize>>,
    /// Target name to the steps declaring `before = target`.
    preceding: HashMap<&'r str, Vec<usize>>,
    marks: Vec<Mark>,
    sorted: Vec<usize>,
}

impl<'c, 'r> Sorter<'c, 'r> {
    fn new(candidates: &'c [Candidate<'r>], groups: Vec<Group>) -> Self {
        let mut by_name: HashMap<&'r str, Vec<usize>> = HashMap::new();
        let mut preceding: HashMap<&'r str, Vec<usize>> = HashMap::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            by_name.entry(candidate.name()).or_default().push(idx);
            if let Some(Anchor::Step(target)) = candidate.before {
                preceding.entry(target.as_str()).or_default().push(idx);
            }
        }

        Self {
            candidates,
            groups,
            by_name,
            preceding,
            marks: vec![Mark::Unvisited; candidates.len()],
            sorted: Vec::with_capacity(candidates.len()),
        }
    }

    fn predecessors(&self, idx: usize) -> Vec<Edge> {
        let candidate = &self.candidates[idx];
        let mut edges = Vec::new();

        if let Some(steps) = self.preceding.get(candidate.name()) {
            edges.extend(steps.iter().map(|&pred| Edge {
                pred,
                owner: pred,
                constraint: Constraint::Before(Anchor::Step(candidate.name().to_string())),
            }));
        }
        if let Some(Anchor::Step(target)) = candidate.after {
            if let Some(steps) = self.by_name.get(target.as_str()) {
                edges.extend(steps.iter().map(|&pred| Edge {
                    pred,
                    owner: idx,
                    constraint: Constraint::After(Anchor::Step(target.clone())),
                }));
            }
        }

        edges.sort_by_key(|edge| edge.pred);
        edges
    }

    fn visit(&mut self, idx: usize) -> Result<(), Conflict> {
        if self.marks[idx] == Mark::Placed {
            return Ok(());
        }
        self.marks[idx] = Mark::Visiting;

        for edge in self.predecessors(idx) {
            if self.groups[edge.pred] > self.groups[idx] {
                return Err(self.conflict(edge));
            }
            match self.marks[edge.pred] {
                Mark::Placed => {}
                Mark::Visiting => return Err(self.conflict(edge)),
                Mark::Unvisited => self.visit(edge.pred)?,
            }
        }

        self.marks[idx] = Mark::Placed;
        self.sorted.push(idx);
        Ok(())
    }

    fn conflict(&self, edge: Edge) -> Conflict {
        Conflict {
            step: self.candidates[edge.owner].name().to_string(),
            constraint: edge.constraint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::step;
    use crate::registry::Registry;
    use crate::step::Step;

    fn before(name: &str, anchor: &str) -> Step {
        Step {
            before: Some(Anchor::parse(anchor)),
            ..step(name)
        }
    }

    fn after(name: &str, anchor: &str) -> Step {
        Step {
            after: Some(Anchor::parse(anchor)),
            ..step(name)
        }
    }

    fn order_of(steps: Vec<Step>) -> Result<Vec<String>, Conflict> {
        let mut registry = Registry::default();
        for step in steps {
            registry.push(step);
        }
        compile(registry.live()).map(|compiled| compiled.order)
    }

    #[test]
    fn test_registration_order_is_fallback() {
        let order = order_of(vec![step("a"), step("b"), step("c")]).unwrap();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_wildcards_and_before() {
        let order = order_of(vec![after("A", "*"), before("B", "A"), step("C")]).unwrap();
        assert_eq!(order, ["B", "C", "A"]);
    }

    #[test]
    fn test_before_target_registered_later() {
        let order = order_of(vec![step("x"), before("y", "z"), step("z")]).unwrap();
        assert_eq!(order, ["x", "y", "z"]);
    }

    #[test]
    fn test_after_pulls_step_behind_target() {
        let order = order_of(vec![after("a", "c"), step("b"), step("c")]).unwrap();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn test_missing_target_is_ignored() {
        let order = order_of(vec![before("a", "ghost"), after("b", "phantom")]).unwrap();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_mutual_before_is_conflict() {
        let err = order_of(vec![before("A", "B"), before("B", "A")]).unwrap_err();
        assert_eq!(err.step, "A");
        assert_eq!(err.constraint, Constraint::Before(Anchor::parse("B")));
    }

    #[test]
    fn test_before_and_after_same_target_is_conflict() {
        let err = order_of(vec![
            step("x"),
            Step {
                before: Some(Anchor::parse("x")),
                after: Some(Anchor::parse("x")),
                ..step("y")
            },
        ])
        .unwrap_err();
        assert_eq!(err.step, "y");
    }

    #[test]
    fn test_self_reference_is_conflict() {
        let err = order_of(vec![after("a", "a")]).unwrap_err();
        assert_eq!(
            err,
            Conflict {
                step: "a".into(),
                constraint: Constraint::After(Anchor::parse("a")),
            }
        );
    }

    #[test]
    fn test_anchor_in_incompatible_group_is_conflict() {
        let err = order_of(vec![before("y", "*"), before("z", "y")]).unwrap_err();
        assert_eq!(err.step, "z");
        assert_eq!(err.constraint, Constraint::Before(Anchor::parse("y")));

        let err = order_of(vec![after("x", "*"), after("y", "x")]).unwrap_err();
        assert_eq!(err.step, "y");
    }

    #[test]
    fn test_first_step_after_middle_is_conflict() {
        let err = order_of(vec![
            step("m"),
            Step {
                before: Some(Anchor::All),
                after: Some(Anchor::parse("m")),
                ..step("f")
            },
        ])
        .unwrap_err();
        assert_eq!(err.step, "f");
        assert_eq!(err.constraint, Constraint::After(Anchor::parse("m")));
    }

    #[test]
    fn test_both_wildcards_is_conflict() {
        let err = order_of(vec![Step {
            before: Some(Anchor::All),
            after: Some(Anchor::All),
            ..step("w")
        }])
        .unwrap_err();
        assert_eq!(err.step, "w");
    }

    #[test]
    fn test_before_inside_last_group() {
        let order = order_of(vec![
            after("flush", "*"),
            step("work"),
            Step {
                before: Some(Anchor::parse("flush")),
                after: Some(Anchor::All),
                ..step("log")
            },
        ])
        .unwrap();
        assert_eq!(order, ["work", "log", "flush"]);
    }

    #[test]
    fn test_duplicates_all_run_and_are_reported() {
        let mut registry = Registry::default();
        registry.push(step("X"));
        registry.push(step("Y"));
        registry.push(step("Y"));
        let compiled = compile(registry.live()).unwrap();
        assert_eq!(compiled.order, ["X", "Y", "Y"]);
        assert_eq!(compiled.actions.len(), 3);
        assert_eq!(compiled.duplicates.len(), 1);
        assert_eq!(compiled.duplicates[0].name, "Y");
    }
}
