pub mod soil;
