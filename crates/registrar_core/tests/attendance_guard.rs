use registrar_core::db::open_db_in_memory;
use registrar_core::model::attendance::AttendanceKey;
use registrar_core::{
    AttendanceId, AttendanceRecord, AttendanceService, AttendanceStatus, AttendanceStore,
    ConflictKind, CoreError, DayOfWeek, EnrollmentCoordinator, EnrollmentId, EnrollmentPolicy,
    EntityRef, NewSection, RepoResult, SectionStore, SqliteAttendanceStore,
    SqliteEnrollmentStore, SqliteSectionStore, SqliteStudentStore, StudentStore,
    ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn enrolled(conn: &Connection) -> EnrollmentId {
    let section = SqliteSectionStore::try_new(conn)
        .unwrap()
        .create_section(&NewSection::new("BIO110", "2026-fall", 20))
        .unwrap();
    let student = SqliteStudentStore::try_new(conn)
        .unwrap()
        .create_student("Rosalind")
        .unwrap();
    EnrollmentCoordinator::try_new(conn, EnrollmentPolicy::default())
        .unwrap()
        .enroll(student, section.id)
        .unwrap()
        .enrollment_id
}

fn service(
    conn: &Connection,
) -> AttendanceService<SqliteAttendanceStore<'_>, SqliteEnrollmentStore<'_>> {
    AttendanceService::new(
        SqliteAttendanceStore::try_new(conn).unwrap(),
        SqliteEnrollmentStore::try_new(conn).unwrap(),
    )
}

#[test]
fn second_record_for_same_slot_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    let service = service(&conn);

    assert!(service
        .can_record(enrollment_id, 1, Some(DayOfWeek::Mon))
        .unwrap());
    service
        .record_attendance(enrollment_id, 1, Some(DayOfWeek::Mon), AttendanceStatus::Present)
        .unwrap();
    assert!(!service
        .can_record(enrollment_id, 1, Some(DayOfWeek::Mon))
        .unwrap());

    let err = service
        .record_attendance(enrollment_id, 1, Some(DayOfWeek::Mon), AttendanceStatus::Absent)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictKind::AttendanceAlreadyRecorded)
    ));
    assert_eq!(service.list_for_enrollment(enrollment_id).unwrap().len(), 1);
}

#[test]
fn missing_day_is_its_own_slot() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    let service = service(&conn);

    service
        .record_attendance(enrollment_id, 2, None, AttendanceStatus::Present)
        .unwrap();
    service
        .record_attendance(enrollment_id, 2, Some(DayOfWeek::Tue), AttendanceStatus::Absent)
        .unwrap();

    assert!(!service.can_record(enrollment_id, 2, None).unwrap());
    let err = service
        .record_attendance(enrollment_id, 2, None, AttendanceStatus::Absent)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictKind::AttendanceAlreadyRecorded)
    ));

    let records = service.list_for_enrollment(enrollment_id).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].day, None);
    assert_eq!(records[1].day, Some(DayOfWeek::Tue));
}

#[test]
fn storage_index_rejects_duplicate_null_day_slots() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    let insert = "INSERT INTO attendance (id, enrollment_id, week, day, status)
                  VALUES (?1, ?2, 3, NULL, 'present');";

    conn.execute(insert, [Uuid::new_v4().to_string(), enrollment_id.to_string()])
        .unwrap();
    let duplicate = conn.execute(insert, [Uuid::new_v4().to_string(), enrollment_id.to_string()]);
    assert!(duplicate.is_err());
}

#[test]
fn status_update_in_place_is_always_allowed() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    let service = service(&conn);

    let record = service
        .record_attendance(enrollment_id, 4, Some(DayOfWeek::Fri), AttendanceStatus::Absent)
        .unwrap();
    let updated = service
        .update_status(record.id, AttendanceStatus::Present)
        .unwrap();
    assert_eq!(updated.id, record.id);
    assert_eq!(updated.key(), record.key());
    assert_eq!(updated.status, AttendanceStatus::Present);

    let missing = Uuid::new_v4();
    let err = service
        .update_status(missing, AttendanceStatus::Present)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(EntityRef::Attendance(id)) if id == missing));
}

#[test]
fn invalid_week_and_unknown_enrollment_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    let service = service(&conn);

    let err = service
        .record_attendance(enrollment_id, 0, None, AttendanceStatus::Present)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::InvalidWeek(0))
    ));

    let unknown = Uuid::new_v4();
    let err = service
        .record_attendance(unknown, 1, None, AttendanceStatus::Present)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(EntityRef::Enrollment(id)) if id == unknown));
}

/// Attendance store whose slot lookups miss rows, like a reader that raced
/// a concurrent insert.
struct StaleAttendanceStore<'conn> {
    inner: SqliteAttendanceStore<'conn>,
}

impl AttendanceStore for StaleAttendanceStore<'_> {
    fn find_record(&self, _key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>> {
        Ok(None)
    }

    fn get_record(&self, id: AttendanceId) -> RepoResult<Option<AttendanceRecord>> {
        self.inner.get_record(id)
    }

    fn insert_record(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        self.inner.insert_record(key, status)
    }

    fn update_status(&self, id: AttendanceId, status: AttendanceStatus) -> RepoResult<bool> {
        self.inner.update_status(id, status)
    }

    fn list_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        self.inner.list_for_enrollment(enrollment_id)
    }
}

#[test]
fn racing_insert_is_rejected_by_storage_index() {
    let conn = open_db_in_memory().unwrap();
    let enrollment_id = enrolled(&conn);
    service(&conn)
        .record_attendance(enrollment_id, 5, None, AttendanceStatus::Present)
        .unwrap();

    let stale = AttendanceService::new(
        StaleAttendanceStore {
            inner: SqliteAttendanceStore::try_new(&conn).unwrap(),
        },
        SqliteEnrollmentStore::try_new(&conn).unwrap(),
    );
    assert!(stale.can_record(enrollment_id, 5, None).unwrap());
    let err = stale
        .record_attendance(enrollment_id, 5, None, AttendanceStatus::Absent)
        .unwrap_err();
    assert!(
        matches!(err, CoreError::Conflict(ConflictKind::AttendanceAlreadyRecorded)),
        "unexpected error: {err}"
    );

    let records = service(&conn).list_for_enrollment(enrollment_id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Present);
}
