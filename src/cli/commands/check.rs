//! Check command - Report what a stage asks for before accepting an opportunity

use std::path::Path;

use crate::domain::{
    build_drag_operation, columns_from_board, find_column, find_opportunity, DragPrompt,
    RequirementCheck,
};
use crate::errors::Result;
use crate::fs::read_board;

use super::{locate, open_board};

/// One line per unmet requirement
pub fn describe_requirements(check: &RequirementCheck) -> Vec<String> {
    let mut lines: Vec<String> = check
        .missing_fields
        .iter()
        .map(|f| format!("field {} ({})", f.name, f.field_type))
        .collect();
    lines.extend(
        check
            .missing_tasks
            .iter()
            .map(|t| format!("task {} ({})", t.name, t.id)),
    );
    if let Some(kind) = check.missing_reason {
        lines.push(format!("{} reason", kind));
    }
    lines
}

/// Evaluate a move without performing it
pub async fn run(cwd: Option<&Path>, id: &str, to: &str) -> Result<()> {
    let (root, config) = open_board(cwd)?;
    let board = read_board(&root)?;
    let columns = columns_from_board(&board, config.resync_include_archived);

    let source = locate(&columns, id)?;
    let destination = find_column(&columns, to)?;
    let index = destination.opportunities.len();
    let opp = find_opportunity(&columns, &source.stage.id, id)?;

    let operation = build_drag_operation(opp, &source.stage.id, &destination.stage, index);
    match operation.prompt() {
        DragPrompt::None if operation.is_reorder() => {
            println!("{} is already in {}", id, destination.stage.name);
        }
        DragPrompt::None => println!("{} can move to {} right away", id, destination.stage.name),
        DragPrompt::ReasonOnly(kind) => {
            println!("{} needs a {} reason to enter {}", id, kind, destination.stage.name)
        }
        DragPrompt::RequiredFields { .. } => {
            println!("{} needs before entering {}:", id, destination.stage.name);
            for line in describe_requirements(&operation.requirements) {
                println!("  - {}", line);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluate_requirements;
    use crate::schemas::{Board, Opportunity};

    #[test]
    fn test_describe_requirements() {
        let board = Board::starter();
        let opp = Opportunity::new("o1", "sales", "lead", "One");

        let proposal = board.stage("proposal").unwrap();
        let lines = describe_requirements(&evaluate_requirements(&opp, proposal));
        assert_eq!(
            lines,
            vec![
                "field budget (number)".to_string(),
                "task Discovery call (proposal-discovery)".to_string(),
            ]
        );

        let lost = board.stage("lost").unwrap();
        assert_eq!(
            describe_requirements(&evaluate_requirements(&opp, lost)),
            vec!["loss reason".to_string()]
        );
    }
}
