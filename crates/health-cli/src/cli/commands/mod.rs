pub mod activities;
pub mod load;
pub mod metrics;
pub mod types;
pub mod workouts;

pub use activities::list as list_activities;
pub use load::{run as load, status};
pub use metrics::{show as show_metrics, Period};
pub use types::list as list_types;
pub use workouts::totals as workout_totals;
