pub mod controls;
pub mod master;
pub mod slave;

pub use controls::ControlsPage;
pub use master::MasterPage;
pub use slave::SlavePage;
