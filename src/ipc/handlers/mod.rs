pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod grading;
pub mod schools;
pub mod staff;
pub mod students;
pub mod subjects;
pub mod taxonomy;
pub mod timetable;
pub mod working_days;
