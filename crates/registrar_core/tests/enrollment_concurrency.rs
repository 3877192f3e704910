//! Multi-connection enroll/drop races against one file-backed database.
//! Every worker thread owns its connection, as production workers would.

use registrar_core::db::open_db;
use registrar_core::{
    ConflictKind, CoreError, CoreResult, EnrollmentCoordinator, EnrollmentPolicy, NewSection,
    SectionId, SectionStore, SqliteSectionStore, SqliteStudentStore, StudentId, StudentStore,
};
use std::path::Path;
use std::sync::Barrier;
use std::thread;

struct Fixture {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    section_id: SectionId,
    students: Vec<StudentId>,
}

fn fixture(capacity: u32, student_count: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registrar.sqlite3");
    let conn = open_db(&path).unwrap();

    let section = SqliteSectionStore::try_new(&conn)
        .unwrap()
        .create_section(&NewSection::new("MATH200", "2026-spring", capacity))
        .unwrap();
    let student_store = SqliteStudentStore::try_new(&conn).unwrap();
    let students = (0..student_count)
        .map(|index| {
            student_store
                .create_student(&format!("student-{index}"))
                .unwrap()
        })
        .collect();

    Fixture {
        _dir: dir,
        path,
        section_id: section.id,
        students,
    }
}

fn with_coordinator<T>(
    path: &Path,
    work: impl FnOnce(
        &EnrollmentCoordinator<
            '_,
            SqliteSectionStore<'_>,
            SqliteStudentStore<'_>,
            registrar_core::SqliteEnrollmentStore<'_>,
        >,
    ) -> T,
) -> T {
    let conn = open_db(path).unwrap();
    let coordinator = EnrollmentCoordinator::try_new(&conn, EnrollmentPolicy::default()).unwrap();
    work(&coordinator)
}

#[test]
fn last_seat_is_admitted_exactly_once() {
    const CONTENDERS: usize = 8;
    let fixture = fixture(1, CONTENDERS);
    let barrier = Barrier::new(CONTENDERS);

    let results: Vec<CoreResult<()>> = thread::scope(|scope| {
        let handles: Vec<_> = fixture
            .students
            .iter()
            .map(|&student| {
                let barrier = &barrier;
                let path = fixture.path.as_path();
                let section_id = fixture.section_id;
                scope.spawn(move || {
                    with_coordinator(path, |coordinator| {
                        barrier.wait();
                        coordinator.enroll(student, section_id).map(|_| ())
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(admitted, 1);
    for result in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            matches!(
                result,
                CoreError::Conflict(ConflictKind::SectionFull)
                    | CoreError::Conflict(ConflictKind::ConcurrentUpdate { .. })
            ),
            "unexpected error: {result}"
        );
    }

    let occupancy = with_coordinator(&fixture.path, |coordinator| {
        coordinator.section_occupancy(fixture.section_id).unwrap()
    });
    assert_eq!(occupancy.current_enrollment_count, 1);
    assert!(occupancy.is_consistent());
}

#[test]
fn same_student_racing_itself_enrolls_once() {
    const CONTENDERS: usize = 4;
    let fixture = fixture(10, 1);
    let student = fixture.students[0];
    let barrier = Barrier::new(CONTENDERS);

    let results: Vec<CoreResult<()>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let barrier = &barrier;
                let path = fixture.path.as_path();
                let section_id = fixture.section_id;
                scope.spawn(move || {
                    with_coordinator(path, |coordinator| {
                        barrier.wait();
                        coordinator.enroll(student, section_id).map(|_| ())
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            matches!(
                err,
                CoreError::Conflict(ConflictKind::AlreadyEnrolled)
                    | CoreError::Conflict(ConflictKind::ConcurrentUpdate { .. })
            ),
            "unexpected error: {err}"
        );
    }

    let occupancy = with_coordinator(&fixture.path, |coordinator| {
        coordinator.section_occupancy(fixture.section_id).unwrap()
    });
    assert_eq!(occupancy.active_enrollments, 1);
    assert!(occupancy.is_consistent());
}

#[test]
fn concurrent_double_drop_succeeds_once() {
    const CONTENDERS: usize = 4;
    let fixture = fixture(3, 1);
    let student = fixture.students[0];
    with_coordinator(&fixture.path, |coordinator| {
        coordinator.enroll(student, fixture.section_id).unwrap();
    });
    let barrier = Barrier::new(CONTENDERS);

    let results: Vec<CoreResult<()>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let barrier = &barrier;
                let path = fixture.path.as_path();
                let section_id = fixture.section_id;
                scope.spawn(move || {
                    with_coordinator(path, |coordinator| {
                        barrier.wait();
                        coordinator.drop_enrollment(student, section_id)
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            matches!(err, CoreError::Conflict(ConflictKind::AlreadyDropped)),
            "unexpected error: {err}"
        );
    }

    let occupancy = with_coordinator(&fixture.path, |coordinator| {
        coordinator.section_occupancy(fixture.section_id).unwrap()
    });
    assert_eq!(occupancy.current_enrollment_count, 0);
    assert!(occupancy.is_consistent());
}

#[test]
fn mixed_enroll_and_drop_keeps_counter_equal_to_active_rows() {
    const STUDENTS: usize = 12;
    const CAPACITY: u32 = 5;
    let fixture = fixture(CAPACITY, STUDENTS);
    let barrier = Barrier::new(STUDENTS);

    thread::scope(|scope| {
        for (index, &student) in fixture.students.iter().enumerate() {
            let barrier = &barrier;
            let path = fixture.path.as_path();
            let section_id = fixture.section_id;
            scope.spawn(move || {
                with_coordinator(path, |coordinator| {
                    barrier.wait();
                    for round in 0..3 {
                        let _ = coordinator.enroll(student, section_id);
                        // Odd students give their seat back on alternate rounds.
                        if (index + round) % 2 == 1 {
                            let _ = coordinator.drop_enrollment(student, section_id);
                        }
                        let occupancy = coordinator.section_occupancy(section_id).unwrap();
                        assert!(occupancy.current_enrollment_count <= CAPACITY);
                    }
                })
            });
        }
    });

    let occupancy = with_coordinator(&fixture.path, |coordinator| {
        coordinator.section_occupancy(fixture.section_id).unwrap()
    });
    assert!(occupancy.is_consistent(), "occupancy drifted: {occupancy:?}");
}
