//! Domain logic for stage requirements, drag operations and move lifecycles

mod columns;
mod drag;
mod requirements;
mod states;


pub use columns::{
    columns_from_board, find_column, find_movable_opportunity, find_opportunity, place_opportunity,
    StageColumn,
};
pub use drag::{build_drag_operation, DragOperation, DragPrompt};
pub use requirements::{
    evaluate_requirements, is_empty_value, missing_required_fields, missing_required_tasks,
    required_reason, ReasonKind, RequirementCheck,
};
pub use states::{get_allowed_next_states, is_terminal_state, MoveLifecycle, MoveState};
