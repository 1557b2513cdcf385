/// Common test utilities for integration tests
///
/// - A recording disk controller shared with the test through `Arc<Mutex<_>>`
/// - A diskstats file in a temp directory that tests rewrite between cycles
pub mod fake_diskstats;
pub mod mock_controller;
