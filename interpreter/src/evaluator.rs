use xtract::operation::step::{Step, StepKind};
use xtract::operation::{Comparison, Operation, OperationKind, Test};

use crate::environment::Variables;
use crate::text::{letters_only, order};
use crate::values::{Site, step_values};

/// One `-if`/`-unless` group with its `-and`/`-or` continuations.
struct Group {
    negated: bool,
    any: bool,
    /// Tests that must hold.
    required: usize,
    /// Tests that held.
    observed: usize,
}

impl Group {
    /// Any forbidden match counts for a negated group.
    fn holds(&self) -> bool {
        if self.any || self.negated {
            self.observed > 0
        } else {
            self.observed >= self.required
        }
    }

    /// For a negated group, a holding group forbids the block.
    fn passes(&self) -> bool {
        self.holds() != self.negated
    }
}

/// Decide whether a block's conditions hold at `site`.
///
/// Groups are conjoined. Within an `-if` group, `-and` requires every test
/// and `-or` any one; an `-unless` group suppresses the block when any of
/// its tests match.
pub fn conditions_hold(conditions: &[Operation], site: &Site<'_>, vars: &Variables) -> bool {
    let mut current: Option<Group> = None;
    for condition in conditions {
        let OperationKind::Test(test) = condition.kind else {
            continue;
        };
        if test.starts_group() {
            if let Some(group) = current.take() {
                if !group.passes() {
                    return false;
                }
            }
            current = Some(Group {
                negated: test.is_negated(),
                any: false,
                required: 0,
                observed: 0,
            });
        }
        let Some(group) = current.as_mut() else {
            continue;
        };
        if test == Test::Or {
            group.any = true;
        }
        group.required += 1;
        if match_found(condition, site, vars) {
            group.observed += 1;
        }
    }
    current.is_none_or(|group| group.passes())
}

/// Evaluate a single test: presence of its operand, or, with a constraint,
/// whether any operand value satisfies it.
pub fn match_found(condition: &Operation, site: &Site<'_>, vars: &Variables) -> bool {
    let Some(step) = condition.steps.first() else {
        return false;
    };

    let Some(constraint) = condition.constraint() else {
        return match step.kind {
            // --- Presence ---
            StepKind::Variable => vars.contains(&step.name),
            StepKind::Element if step.attribute.is_none() && step.slice.is_whole() => {
                step.is_current_node() || !site.elements(step).is_empty()
            }
            // --- Probes ---
            StepKind::Count | StepKind::Length => step_values(step, site, vars, false)
                .iter()
                .any(|value| value.parse::<i64>().is_ok_and(|n| n > 0)),
            _ => !step_values(step, site, vars, false).is_empty(),
        };
    };

    let StepKind::Constraint(comparison) = constraint.kind else {
        return false;
    };
    step_values(step, site, vars, false)
        .iter()
        .any(|value| satisfies(value, comparison, constraint, site, vars))
}

/// First value the element addressed by `constraint` yields at `site`.
fn element_operand(constraint: &Step, site: &Site<'_>, vars: &Variables) -> Option<String> {
    let mut element = constraint.clone();
    element.kind = StepKind::Element;
    step_values(&element, site, vars, false).into_iter().next()
}

fn right_operand(
    comparison: Comparison,
    constraint: &Step,
    site: &Site<'_>,
    vars: &Variables,
) -> Option<String> {
    if let Some(name) = constraint.value.strip_prefix('&') {
        return vars.get(name).map(str::to_string);
    }
    if comparison.is_element_relative() {
        return element_operand(constraint, site, vars);
    }
    if comparison.is_numeric() && constraint.value.trim().parse::<i64>().is_err() {
        return element_operand(constraint, site, vars);
    }
    Some(constraint.value.clone())
}

fn padded_words(text: &str) -> String {
    format!(" {} ", letters_only(text, true))
}

fn satisfies(
    value: &str,
    comparison: Comparison,
    constraint: &Step,
    site: &Site<'_>,
    vars: &Variables,
) -> bool {
    let Some(operand) = right_operand(comparison, constraint, site, vars) else {
        return false;
    };

    if comparison.is_numeric() {
        let (Ok(left), Ok(right)) = (value.trim().parse::<i64>(), operand.trim().parse::<i64>())
        else {
            return false;
        };
        return match comparison {
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            _ => false,
        };
    }

    let left = value.to_lowercase();
    let right = operand.to_lowercase();
    match comparison {
        Comparison::Equals | Comparison::IsEqualTo => left == right,
        Comparison::IsNot | Comparison::DiffersFrom => left != right,
        Comparison::Contains => left.contains(&right),
        Comparison::Includes => padded_words(&left).contains(&padded_words(&right)),
        Comparison::IsWithin => right.contains(&left),
        Comparison::StartsWith => left.starts_with(&right),
        Comparison::EndsWith => left.ends_with(&right),
        Comparison::IsBefore => left < right,
        Comparison::IsAfter => left > right,
        Comparison::Matches => letters_only(&left, true) == letters_only(&right, true),
        Comparison::Resembles => {
            order(&letters_only(&left, true)) == order(&letters_only(&right, true))
        }
        Comparison::Gt
        | Comparison::Ge
        | Comparison::Lt
        | Comparison::Le
        | Comparison::Eq
        | Comparison::Ne => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtract::document::{Record, TextPolicy, parse_record};
    use xtract::parser::Parser;

    const REC: &str = "<Rec><Status>Active</Status><Name>Phospholipase A2</Name>\
        <Score>3</Score><Score>12</Score><Limit>10</Limit><Alias>phospholipase a2</Alias>\
        <Empty/></Rec>";

    fn record() -> Record {
        parse_record(REC, "Rec", TextPolicy::default()).unwrap()
    }

    /// Compile `-pattern Rec <conditions> -element Name` and evaluate the conditions.
    fn holds(conditions: &str, vars: &Variables) -> bool {
        let mut tokens = vec!["-pattern".to_string(), "Rec".to_string()];
        tokens.extend(conditions.split_whitespace().map(str::to_string));
        tokens.extend(["-element".to_string(), "Name".to_string()]);
        let query = Parser::new(&tokens, 0).parse().unwrap();
        let block = query.root.pattern().unwrap().clone();
        let record = record();
        let site = Site::new(&record, &record.root, 1, 1);
        conditions_hold(&block.conditions, &site, vars)
    }

    fn check(conditions: &str) -> bool {
        holds(conditions, &Variables::new())
    }

    #[test]
    fn presence() {
        assert!(check("-if Status"));
        assert!(check("-if Empty"));
        assert!(!check("-if Missing"));
        assert!(check("-unless Missing"));
        assert!(check("-if #Score -gt 1"));
        assert!(!check("-if #Missing"));
    }

    #[test]
    fn and_requires_all_or_requires_any() {
        assert!(check("-if Status -and Name"));
        assert!(!check("-if Status -and Missing"));
        assert!(check("-if Missing -or Name"));
        assert!(!check("-if Missing -or Absent"));
    }

    #[test]
    fn unless_suppresses_regardless_of_if() {
        assert!(!check("-if Status -unless Name"));
        assert!(!check("-unless Name -if Status"));
        assert!(check("-if Status -unless Missing"));
        assert!(!check("-unless Status -and Missing"));
        assert!(check("-unless Missing -and Absent"));
    }

    #[test]
    fn string_comparisons_ignore_case() {
        assert!(check("-if Status -equals active"));
        assert!(!check("-if Status -equals Closed"));
        assert!(check("-if Name -contains LIPASE"));
        assert!(check("-if Name -includes a2"));
        assert!(!check("-if Name -includes lipase"));
        assert!(check("-if Status -starts-with Act"));
        assert!(check("-if Status -ends-with ive"));
        assert!(check("-if Status -is-not Closed"));
        assert!(check("-if Status -is-before Closing"));
        assert!(check("-if Status -is-within Inactive"));
        assert!(check("-if Name -is-equal-to Alias"));
        assert!(!check("-if Name -differs-from Alias"));
    }

    #[test]
    fn fuzzy_comparisons() {
        assert!(check("-if Name -matches phospholipase,a2"));
        assert!(check("-if Name -resembles A2-Phospholipase"));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(check("-if Score -gt 10"));
        assert!(check("-if Score -lt 4"));
        assert!(!check("-if Score -eq 5"));
        assert!(check("-if Score -ge Limit"));
        assert!(!check("-if Status -gt 1"));
    }

    #[test]
    fn variable_operands() {
        let mut vars = Variables::new();
        vars.set("MIN", "11".into());
        assert!(holds("-if Score -gt &MIN", &vars));
        assert!(holds("-if &MIN", &vars));
        assert!(!holds("-if &OTHER", &vars));
    }
}
