pub mod answer;
pub mod instrument;
pub mod result;
