//! Navigator sessions driven through a host loop: commands out, listing
//! completions back in, with a simulated debounce clock.

use std::time::Duration;

use drive_dash::backend::memory::MemoryBackend;
use drive_dash::backend::{
    DirEntry, DriveKind, DriveSnapshot, EntryKind, FileSystemItem, StorageBackend,
};
use drive_dash::navigator::{DestinationNavigator, NavCommand, NavigatorState, RequestToken};

fn drive(id: &str, free: u64) -> DriveSnapshot {
    DriveSnapshot {
        id: id.to_string(),
        label: format!("Drive {id}"),
        total_size: 10_000,
        used_space: 10_000 - free,
        free_space: free,
        usage_percentage: DriveSnapshot::usage_from_bytes(10_000, 10_000 - free),
        kind: DriveKind::Local,
    }
}

fn folder(name: &str) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        size: 0,
        kind: EntryKind::Folder,
    }
}

fn file(name: &str, size: u64) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        size,
        kind: EntryKind::File,
    }
}

fn item(name: &str, path: &str, size: u64) -> FileSystemItem {
    FileSystemItem {
        name: name.to_string(),
        path: path.to_string(),
        size,
        kind: EntryKind::File,
    }
}

/// Minimal host loop: executes listing commands against the backend and
/// tracks whether a debounce timer is armed. The test decides when the
/// timer fires.
struct Host {
    backend: MemoryBackend,
    debounce_armed: bool,
    loads_issued: usize,
    pending: Vec<(RequestToken, String)>,
}

impl Host {
    fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            debounce_armed: false,
            loads_issued: 0,
            pending: Vec::new(),
        }
    }

    /// Execute a command tree, buffering listings as in-flight requests.
    fn execute(&mut self, cmd: NavCommand) {
        match cmd {
            NavCommand::None => {}
            NavCommand::StartDebounce(_) => self.debounce_armed = true,
            NavCommand::CancelDebounce => self.debounce_armed = false,
            NavCommand::LoadDirectory { token, path } => {
                self.loads_issued += 1;
                self.pending.push((token, path));
            }
            NavCommand::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
        }
    }

    /// Complete every in-flight listing in issue order.
    fn deliver_all(&mut self, nav: &mut DestinationNavigator) {
        for (token, path) in self.pending.drain(..) {
            nav.directory_loaded(token, self.backend.list_directory(&path));
        }
    }

    fn fire_debounce(&mut self, nav: &mut DestinationNavigator) {
        assert!(self.debounce_armed, "no debounce timer armed");
        self.debounce_armed = false;
        let cmd = nav.debounce_fired();
        self.execute(cmd);
    }
}

fn seeded_host() -> Host {
    let backend = MemoryBackend::new(vec![drive("C", 5000), drive("data", 120)]);
    backend.insert_directory("C/", vec![folder("docs"), folder("media"), file("readme.md", 10)]);
    backend.insert_directory("C/docs/", vec![folder("reports")]);
    backend.insert_directory("C/docs/reports/", vec![]);
    backend.insert_directory("C/media/", vec![]);
    backend.insert_directory("data/", vec![folder("archive")]);
    Host::new(backend)
}

#[test]
fn full_session_descend_and_confirm() {
    let mut host = seeded_host();
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000), drive("data", 120)],
        vec![item("old.log", "data/old.log", 64)],
        Duration::from_millis(300),
    );

    let cmd = nav.select_drive("C");
    host.execute(cmd);
    host.deliver_all(&mut nav);
    assert_eq!(nav.state(), &NavigatorState::Browsing);
    assert_eq!(
        nav.loaded_folders().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["docs", "media"]
    );

    // Double activation descends into docs with exactly one extra listing.
    let docs = nav.loaded_folders()[0].clone();
    let loads_before = host.loads_issued;
    host.execute(nav.activate_folder(&docs));
    host.execute(nav.activate_folder(&docs));
    assert_eq!(host.loads_issued, loads_before + 1);
    assert!(!host.debounce_armed);
    host.deliver_all(&mut nav);
    assert_eq!(nav.current_path(), "C/docs/");
    assert_eq!(nav.loaded_folders()[0].name, "reports");

    // Single activation of reports only retargets the destination.
    let reports = nav.loaded_folders()[0].clone();
    let loads_before = host.loads_issued;
    host.execute(nav.activate_folder(&reports));
    host.fire_debounce(&mut nav);
    assert_eq!(host.loads_issued, loads_before);
    assert_eq!(nav.current_path(), "C/docs/reports/");
    assert_eq!(nav.breadcrumbs(), vec!["C", "docs", "reports"]);

    let request = nav.confirm().unwrap();
    assert_eq!(request.destination_drive, "C");
    assert_eq!(request.destination_base_path, "C/docs/reports/");
}

#[test]
fn breadcrumb_and_parent_navigation_reload() {
    let mut host = seeded_host();
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000)],
        vec![item("old.log", "data/old.log", 64)],
        Duration::from_millis(300),
    );

    host.execute(nav.select_drive("C"));
    host.deliver_all(&mut nav);
    let docs = nav.loaded_folders()[0].clone();
    host.execute(nav.activate_folder(&docs));
    host.execute(nav.activate_folder(&docs));
    host.deliver_all(&mut nav);

    host.execute(nav.go_to_parent());
    host.deliver_all(&mut nav);
    assert_eq!(nav.current_path(), "C/");
    assert_eq!(nav.loaded_folders().len(), 2);

    // Back down, then jump to the root crumb.
    let docs = nav.loaded_folders()[0].clone();
    host.execute(nav.activate_folder(&docs));
    host.execute(nav.activate_folder(&docs));
    host.deliver_all(&mut nav);
    host.execute(nav.go_to_breadcrumb(0));
    host.deliver_all(&mut nav);
    assert_eq!(nav.current_path(), "C/");
    assert_eq!(nav.state(), &NavigatorState::Browsing);
}

#[test]
fn listing_failure_is_recoverable_by_reselecting() {
    let mut host = seeded_host();
    host.backend.mark_unreachable("data/");
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000), drive("data", 120)],
        vec![item("old.log", "C/old.log", 64)],
        Duration::from_millis(300),
    );

    host.execute(nav.select_drive("data"));
    host.deliver_all(&mut nav);
    assert!(matches!(nav.state(), NavigatorState::Error(_)));
    assert!(nav.loaded_folders().is_empty());

    host.execute(nav.select_drive("C"));
    host.deliver_all(&mut nav);
    assert_eq!(nav.state(), &NavigatorState::Browsing);
}

#[test]
fn close_discards_in_flight_listing_and_timer() {
    let mut host = seeded_host();
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000)],
        vec![item("old.log", "data/old.log", 64)],
        Duration::from_millis(300),
    );

    host.execute(nav.select_drive("C"));
    host.deliver_all(&mut nav);
    let docs = nav.loaded_folders()[0].clone();
    host.execute(nav.activate_folder(&docs));
    assert!(host.debounce_armed);

    // A listing is still in flight when the dialog closes.
    host.execute(nav.go_to_breadcrumb(0));
    host.execute(nav.close());
    assert!(!host.debounce_armed);
    host.deliver_all(&mut nav);
    // The late completion must not have resurrected the cursor.
    assert_eq!(nav.state(), &NavigatorState::Loading);
}

#[test]
fn capacity_gate_follows_the_destination_drive() {
    let mut host = seeded_host();
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000), drive("data", 120)],
        vec![item("a.bin", "C/a.bin", 80), item("b.bin", "C/b.bin", 60)],
        Duration::from_millis(300),
    );

    // 140 bytes do not fit on data (120 free).
    host.execute(nav.select_drive("data"));
    host.deliver_all(&mut nav);
    assert!(!nav.can_confirm());
    assert_eq!(nav.confirm().unwrap_err().code(), "DDS-2002");

    // They do fit on C, but C/ is not the source location of any item.
    host.execute(nav.select_drive("C"));
    host.deliver_all(&mut nav);
    assert!(nav.can_confirm());
}

#[test]
fn stale_listing_from_a_superseded_drive_is_dropped() {
    let mut host = seeded_host();
    let mut nav = DestinationNavigator::new(
        vec![drive("C", 5000), drive("data", 120)],
        vec![item("old.log", "C/old.log", 64)],
        Duration::from_millis(300),
    );

    // Two selections before any completion arrives.
    host.execute(nav.select_drive("C"));
    host.execute(nav.select_drive("data"));
    host.deliver_all(&mut nav);

    // Only the data listing landed; the C listing was stale.
    assert_eq!(nav.current_path(), "data/");
    assert_eq!(
        nav.loaded_folders().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["archive"]
    );
}
