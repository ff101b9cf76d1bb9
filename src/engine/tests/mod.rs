pub mod helpers;


// Priority 2 — robustness tests
mod tests_boundary_values;
mod tests_config;
