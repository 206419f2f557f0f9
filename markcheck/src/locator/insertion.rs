use std::fmt;

use crate::error::MarkcheckSyntaxError;
use crate::locator::{LineLoc, LocatorScanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPosition {
    Before,
    After,
}

/// `before:<loc>` or `after:<loc>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionCondition {
    pub position: InsertionPosition,
    pub line_loc: LineLoc,
}

impl InsertionCondition {
    /// Parse a comma-separated condition list, e.g. `before:1, after:-1`.
    pub fn parse_list(attr_key: &str, text: &str) -> Result<Vec<Self>, MarkcheckSyntaxError> {
        let mut scanner = LocatorScanner::new(attr_key, text);
        let mut conditions = Vec::new();
        loop {
            scanner.skip_whitespace();
            let position = if scanner.eat("before:") {
                InsertionPosition::Before
            } else if scanner.eat("after:") {
                InsertionPosition::After
            } else {
                return Err(scanner.error("Expected `before:` or `after:`"));
            };
            let line_loc = scanner.line_loc()?;
            conditions.push(InsertionCondition { position, line_loc });
            scanner.skip_whitespace();
            if scanner.at_end() {
                return Ok(conditions);
            }
            if !scanner.eat(",") {
                return Err(scanner.error("Expected `,`"));
            }
        }
    }
}

impl fmt::Display for InsertionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            InsertionPosition::Before => write!(f, "before:{}", self.line_loc),
            InsertionPosition::After => write!(f, "after:{}", self.line_loc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionRule {
    pub condition: InsertionCondition,
    pub line_group: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertionRules {
    rules: Vec<InsertionRule>,
}

impl InsertionRules {
    /// Pairs conditions with body line groups, 1:1 and in order.
    pub fn new(
        conditions: Vec<InsertionCondition>,
        line_groups: Vec<Vec<String>>,
    ) -> Result<Self, MarkcheckSyntaxError> {
        if conditions.len() != line_groups.len() {
            return Err(MarkcheckSyntaxError::new(format!(
                "Number of insertion conditions ({}) must match number of line groups in the body ({})",
                conditions.len(),
                line_groups.len()
            )));
        }
        let rules = conditions
            .into_iter()
            .zip(line_groups)
            .map(|(condition, line_group)| InsertionRule {
                condition,
                line_group,
            })
            .collect();
        Ok(InsertionRules { rules })
    }

    /// Emit `lines` with the line groups inserted. Locators are resolved
    /// against `lines` as given, so inserted lines never shift them.
    pub fn apply(&self, lines: &[String]) -> Result<Vec<String>, MarkcheckSyntaxError> {
        if self.rules.is_empty() {
            return Ok(lines.to_vec());
        }
        let resolved = self
            .rules
            .iter()
            .map(|rule| {
                let line_number = rule.condition.line_loc.resolve(lines)?;
                Ok((rule.condition.position, line_number, rule.line_group.as_slice()))
            })
            .collect::<Result<Vec<_>, MarkcheckSyntaxError>>()?;

        let mut result = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let line_number = index + 1;
            push_groups(&resolved, InsertionPosition::Before, line_number, &mut result);
            result.push(line.clone());
            push_groups(&resolved, InsertionPosition::After, line_number, &mut result);
        }
        Ok(result)
    }
}

fn push_groups(
    resolved: &[(InsertionPosition, usize, &[String])],
    position: InsertionPosition,
    line_number: usize,
    result: &mut Vec<String>,
) {
    for (rule_position, rule_line, group) in resolved {
        if *rule_position == position && *rule_line == line_number {
            result.extend(group.iter().cloned());
        }
    }
}
