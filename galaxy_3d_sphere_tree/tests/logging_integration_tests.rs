//! Integration tests for the logging system
//!
//! These tests install a capturing logger and check what the sphere tree
//! reports through it.
//!
//! Run with: cargo test --test logging_integration_tests

use galaxy_3d_sphere_tree::galaxy3d::log::{self, Logger, LogEntry, LogSeverity};
use galaxy_3d_sphere_tree::galaxy3d::math::BoundingSphere;
use galaxy_3d_sphere_tree::galaxy3d::sphere_tree::{ObjectVisibilitySet, UserData};
use galaxy_3d_sphere_tree::galaxy3d::{Error, SphereTree};
use galaxy_3d_sphere_tree::glam::Vec3;
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn with_captured_logs<F: FnOnce()>(f: F) -> Vec<LogEntry> {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);
    f();
    log::reset_logger();

    let captured = entries.lock().unwrap().clone();
    captured
}

fn unit_sphere(x: f32) -> BoundingSphere {
    BoundingSphere::new(Vec3::new(x, 0.0, 0.0), 1.0)
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let entries = with_captured_logs(|| {
        log::log(LogSeverity::Info, "test::module", "Test info message".to_string());
        log::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
        log::log(LogSeverity::Error, "test::module", "Test error message".to_string());
    });
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[1].severity, LogSeverity::Warn);
    assert_eq!(entries[2].severity, LogSeverity::Error);
    assert!(entries.iter().all(|e| e.source == "test::module"));
}

#[test]
#[serial]
fn test_integration_tree_creation_is_logged() {
    let entries = with_captured_logs(|| {
        let _tree: SphereTree = SphereTree::new(16, 2.0, 0.1, None).unwrap();
    });

    let created = entries
        .iter()
        .find(|e| e.message.starts_with("Created sphere tree"))
        .expect("creation message");
    assert_eq!(created.severity, LogSeverity::Info);
    assert_eq!(created.source, "galaxy3d::SphereTree");
    assert!(created.message.contains("pool capacity 32"));
}

#[test]
#[serial]
fn test_integration_invalid_config_logs_error() {
    let mut result = None;
    let entries = with_captured_logs(|| {
        result = Some(SphereTree::<ObjectVisibilitySet>::new(0, 2.0, 0.1, None).map(|_| ()));
    });

    assert!(matches!(result, Some(Err(Error::InitializationFailed(_)))));
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Error));
}

#[test]
#[serial]
fn test_integration_stale_handle_error_has_location() {
    let entries = with_captured_logs(|| {
        let mut tree: SphereTree = SphereTree::new(4, 2.0, 0.1, None).unwrap();
        let leaf = tree.add_sphere(unit_sphere(0.0), UserData(1)).unwrap();
        tree.remove_sphere(leaf).unwrap();
        assert!(tree.remove_sphere(leaf).is_err());
    });

    let error = entries
        .iter()
        .find(|e| e.severity == LogSeverity::Error)
        .expect("error entry");
    assert!(error.message.contains("stale handle"));
    assert!(error.file.is_some());
    assert!(error.line.is_some());
}

#[test]
#[serial]
fn test_integration_pool_exhaustion_is_logged() {
    let entries = with_captured_logs(|| {
        let mut tree: SphereTree = SphereTree::new(1, 1.0, 0.1, None).unwrap();
        tree.add_sphere(unit_sphere(0.0), UserData(1)).unwrap();
        assert!(tree.add_sphere(unit_sphere(50.0), UserData(2)).is_err());
    });

    // The first leaf could not get a super sphere, the second no slot at all
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Warn
        && e.message.starts_with("No super sphere available")));
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Error
        && e.message.starts_with("Node pool exhausted")));
}

#[test]
#[serial]
fn test_integration_removing_root_warns() {
    let entries = with_captured_logs(|| {
        let mut tree: SphereTree = SphereTree::new(4, 2.0, 0.1, None).unwrap();
        let root = tree.root();
        assert!(tree.remove_sphere(root).is_ok());
        assert!(tree.contains(root));
    });

    assert!(entries.iter().any(|e| e.severity == LogSeverity::Warn
        && e.message.contains("root")));
}

#[test]
#[serial]
fn test_integration_process_is_traced() {
    let entries = with_captured_logs(|| {
        let mut tree: SphereTree = SphereTree::new(8, 2.0, 0.1, None).unwrap();
        let leaf = tree.add_sphere(unit_sphere(0.0), UserData(1)).unwrap();
        tree.update_sphere(leaf, Vec3::new(30.0, 0.0, 0.0), None).unwrap();
        tree.process();
    });

    assert!(entries.iter().any(|e| e.severity == LogSeverity::Trace
        && e.message.starts_with("process:")));
}
