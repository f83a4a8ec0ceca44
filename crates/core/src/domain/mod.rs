pub mod contract;
pub mod option;
pub mod recommendation;
