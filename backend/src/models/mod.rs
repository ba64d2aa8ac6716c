pub mod decision;
pub mod ids;
pub mod reschedule;
pub mod window;

pub use decision::*;
pub use ids::*;
pub use reschedule::*;
pub use window::*;
