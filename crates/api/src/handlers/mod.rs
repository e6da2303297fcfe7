pub mod corrections;
