pub mod ir_model;
pub mod points_to;
