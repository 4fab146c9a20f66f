//! The append-only step registry of one stage.
//!
//! Nothing is ever deleted. `remove` and `replace` append marker entries and
//! [`Registry::live`] works out which entries are in effect:
//!
//! - a `replace` supersedes every earlier entry of its name,
//! - a tombstone suppresses every entry of its name, present and future,
//!   unless a `replace` was registered after it.

use std::collections::HashMap;

use crate::config::Config;
use crate::step::{Action, Anchor, Step};

/// A live entry, with the constraints and slot it is compiled with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'r> {
    pub step: &'r Step,
    pub before: Option<&'r Anchor>,
    pub after: Option<&'r Anchor>,
    /// Position used as the tie-break between unconstrained steps.
    pub slot: usize,
}

impl<'r> Candidate<'r> {
    pub fn name(&self) -> &'r str {
        &self.step.name
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Registry {
    steps: Vec<Step>,
}

impl Registry {
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Entries in effect, in registration order.
    pub fn live(&self) -> Vec<Candidate<'_>> {
        let mut last_tombstone: HashMap<&str, usize> = HashMap::new();
        let mut last_replace: HashMap<&str, usize> = HashMap::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if step.tombstoned {
                last_tombstone.insert(&step.name, idx);
            } else if step.replacing {
                last_replace.insert(&step.name, idx);
            }
        }

        let mut first_slot: HashMap<&str, usize> = HashMap::new();
        let mut inherited: HashMap<&str, (Option<&Anchor>, Option<&Anchor>)> = HashMap::new();
        let mut live = Vec::new();

        for (idx, step) in self.steps.iter().enumerate() {
            let name = step.name.as_str();
            if step.tombstoned {
                continue;
            }
            first_slot.entry(name).or_insert(idx);

            let replaced_at = last_replace.get(name).copied();
            if replaced_at.is_some_and(|r| idx < r) {
                if step.has_constraints() {
                    inherited.insert(name, (step.before.as_ref(), step.after.as_ref()));
                }
                continue;
            }
            if let Some(removed_at) = last_tombstone.get(name).copied() {
                if replaced_at.is_none_or(|r| r < removed_at) {
                    continue;
                }
            }

            let candidate = if step.replacing {
                let (before, after) = if step.has_constraints() {
                    (step.before.as_ref(), step.after.as_ref())
                } else {
                    inherited.get(name).copied().unwrap_or((None, None))
                };
                Candidate {
                    step,
                    before,
                    after,
                    slot: first_slot[name],
                }
            } else {
                Candidate {
                    step,
                    before: step.before.as_ref(),
                    after: step.after.as_ref(),
                    slot: idx,
                }
            };
            live.push(candidate);
        }

        live
    }

    /// Live entries whose condition holds for `config`.
    pub fn candidates(&self, config: &Config) -> Vec<Candidate<'_>> {
        self.live()
            .into_iter()
            .filter(|c| c.step.condition.as_ref().is_none_or(|cond| cond(config)))
            .collect()
    }

    /// The newest live action registered under `name`. Conditions are not
    /// evaluated.
    pub fn lookup(&self, name: &str) -> Option<Action> {
        self.live()
            .into_iter()
            .rev()
            .find(|c| c.name() == name)
            .and_then(|c| c.step.action.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::panic::Location;
    use std::sync::Arc;

    use super::*;

    pub(crate) fn step(name: &str) -> Step {
        Step {
            name: name.to_string(),
            before: None,
            after: None,
            condition: None,
            action: Some(Arc::new(|_| {})),
            tombstoned: false,
            replacing: false,
            location: Location::caller(),
        }
    }

    fn tombstone(name: &str) -> Step {
        Step {
            action: None,
            tombstoned: true,
            ..step(name)
        }
    }

    fn replacement(name: &str) -> Step {
        Step {
            replacing: true,
            ..step(name)
        }
    }

    fn live_names(registry: &Registry) -> Vec<(String, usize)> {
        registry
            .live()
            .iter()
            .map(|c| (c.name().to_string(), c.slot))
            .collect()
    }

    #[test]
    fn test_tombstone_suppresses_earlier_and_later() {
        let mut registry = Registry::default();
        registry.push(step("a"));
        registry.push(step("b"));
        registry.push(tombstone("a"));
        registry.push(step("a"));
        assert_eq!(live_names(&registry), vec![("b".to_string(), 1)]);
        assert!(registry.lookup("a").is_none());
    }

    #[test]
    fn test_replace_after_tombstone_revives() {
        let mut registry = Registry::default();
        registry.push(step("a"));
        registry.push(tombstone("a"));
        registry.push(replacement("a"));
        registry.push(step("a"));
        assert_eq!(
            live_names(&registry),
            vec![("a".to_string(), 0), ("a".to_string(), 3)]
        );
    }

    #[test]
    fn test_replacement_inherits_constraints_and_slot() {
        let mut registry = Registry::default();
        registry.push(step("x"));
        registry.push(Step {
            after: Some(Anchor::parse("x")),
            ..step("y")
        });
        registry.push(step("z"));
        registry.push(replacement("y"));

        let live = registry.live();
        let y = live.iter().find(|c| c.name() == "y").unwrap();
        assert_eq!(y.slot, 1);
        assert_eq!(y.after, Some(&Anchor::parse("x")));
        assert!(y.step.replacing);
    }

    #[test]
    fn test_replacement_keeps_own_constraints() {
        let mut registry = Registry::default();
        registry.push(Step {
            before: Some(Anchor::All),
            ..step("y")
        });
        registry.push(Step {
            after: Some(Anchor::All),
            ..replacement("y")
        });
        let live = registry.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].before, None);
        assert_eq!(live[0].after, Some(&Anchor::All));
    }

    #[test]
    fn test_condition_filters_candidates_only() {
        let mut registry = Registry::default();
        registry.push(Step {
            condition: Some(Arc::new(|config: &Config| config.dry_run)),
            ..step("dry")
        });
        assert!(registry.candidates(&Config::default()).is_empty());
        assert_eq!(registry.candidates(&Config::default().dry_run(true)).len(), 1);
        assert!(registry.lookup("dry").is_some());
    }
}
