use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weekday numbers follow ISO-8601: 1 = Monday .. 7 = Sunday.
pub fn day_name(week_day: u8) -> Option<&'static str> {
    match week_day {
        1 => Some("Monday"),
        2 => Some("Tuesday"),
        3 => Some("Wednesday"),
        4 => Some("Thursday"),
        5 => Some("Friday"),
        6 => Some("Saturday"),
        7 => Some("Sunday"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDayGroup {
    pub id: String,
    pub group_name: String,
    pub days: Vec<u8>,
}

/// Day sets are ordered and duplicate-free; every entry must name a real
/// weekday. Shared by the working-day CRUD handler and the grid generator.
pub fn validate_day_set(days: &[u8]) -> Result<(), String> {
    if days.is_empty() {
        return Err("day set must not be empty".to_string());
    }
    let mut seen = [false; 8];
    for &d in days {
        if day_name(d).is_none() {
            return Err(format!("week day out of range: {}", d));
        }
        if seen[d as usize] {
            return Err(format!("duplicate week day: {}", d));
        }
        seen[d as usize] = true;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub subject_id: String,
    pub staff_id: String,
}

/// Display form shown in a filled grid cell.
pub fn slot_label(subject_name: &str, staff_name: &str) -> String {
    format!("{}/{}", subject_name, staff_name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRef {
    pub id: String,
    pub name: String,
    pub registration_no: String,
}

/// Subject picker search: name substring, case-insensitive.
pub fn filter_subjects<'a>(subjects: &'a [SubjectRef], query: &str) -> Vec<&'a SubjectRef> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return subjects.iter().collect();
    }
    subjects
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&q))
        .collect()
}

/// Teacher picker search: name substring (case-insensitive) or registration
/// number substring (as typed).
pub fn filter_staff<'a>(staff: &'a [StaffRef], query: &str) -> Vec<&'a StaffRef> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return staff.iter().collect();
    }
    let q = trimmed.to_lowercase();
    staff
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&q) || s.registration_no.contains(trimmed))
        .collect()
}

// Wire form for persistence and for the submit payload. Field names are the
// protocol contract; serde emits them as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAssignment {
    pub period_index: usize,
    pub subject_id: String,
    pub staff_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableDay {
    pub week_day: u8,
    pub periods: Vec<PeriodAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    EmptyDaySet,
    BadWeekDay(u8),
    BadPeriodCount(i64),
    UnknownCell { week_day: u8, period_index: usize },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::EmptyDaySet => write!(f, "working-day group has no days"),
            GridError::BadWeekDay(d) => write!(f, "week day out of range: {}", d),
            GridError::BadPeriodCount(n) => {
                write!(f, "total periods must be a positive integer, got {}", n)
            }
            GridError::UnknownCell {
                week_day,
                period_index,
            } => write!(f, "no such cell: day {} period {}", week_day, period_index),
        }
    }
}

impl std::error::Error for GridError {}

#[derive(Debug, Clone)]
pub struct DayColumn {
    pub week_day: u8,
    pub slots: Vec<Option<SlotAssignment>>,
}

/// One day column per weekday in the selected group, in group order; each
/// column holds exactly `total_periods` slots. Days outside the group are
/// not represented.
#[derive(Debug, Clone)]
pub struct TimetableGrid {
    total_periods: usize,
    days: Vec<DayColumn>,
}

/// Validator output: `empty_by_day` holds 0-based empty period indices for
/// every day that still has gaps, keyed by weekday number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    pub complete: bool,
    pub empty_by_day: BTreeMap<u8, Vec<usize>>,
}

impl TimetableGrid {
    pub fn generate(group: &WorkingDayGroup, total_periods: i64) -> Result<Self, GridError> {
        if total_periods < 1 {
            return Err(GridError::BadPeriodCount(total_periods));
        }
        if group.days.is_empty() {
            return Err(GridError::EmptyDaySet);
        }
        let mut days = Vec::with_capacity(group.days.len());
        for &d in &group.days {
            if day_name(d).is_none() {
                return Err(GridError::BadWeekDay(d));
            }
            days.push(DayColumn {
                week_day: d,
                slots: vec![None; total_periods as usize],
            });
        }
        Ok(TimetableGrid {
            total_periods: total_periods as usize,
            days,
        })
    }

    pub fn total_periods(&self) -> usize {
        self.total_periods
    }

    pub fn days(&self) -> &[DayColumn] {
        &self.days
    }

    fn column_mut(&mut self, week_day: u8) -> Option<&mut DayColumn> {
        self.days.iter_mut().find(|c| c.week_day == week_day)
    }

    fn column(&self, week_day: u8) -> Option<&DayColumn> {
        self.days.iter().find(|c| c.week_day == week_day)
    }

    /// `period_index` is 1-based everywhere on the protocol surface.
    pub fn slot(
        &self,
        week_day: u8,
        period_index: usize,
    ) -> Result<Option<&SlotAssignment>, GridError> {
        let col = self.column(week_day).ok_or(GridError::UnknownCell {
            week_day,
            period_index,
        })?;
        if period_index < 1 || period_index > self.total_periods {
            return Err(GridError::UnknownCell {
                week_day,
                period_index,
            });
        }
        Ok(col.slots[period_index - 1].as_ref())
    }

    pub fn set_slot(
        &mut self,
        week_day: u8,
        period_index: usize,
        assignment: SlotAssignment,
    ) -> Result<(), GridError> {
        let total = self.total_periods;
        let col = self.column_mut(week_day).ok_or(GridError::UnknownCell {
            week_day,
            period_index,
        })?;
        if period_index < 1 || period_index > total {
            return Err(GridError::UnknownCell {
                week_day,
                period_index,
            });
        }
        col.slots[period_index - 1] = Some(assignment);
        Ok(())
    }

    /// Seed from stored assignments when editing an existing timetable.
    /// Entries that do not fit the regenerated shape are skipped.
    pub fn seed_from(&mut self, days: &[TimetableDay]) {
        for day in days {
            for p in &day.periods {
                let _ = self.set_slot(
                    day.week_day,
                    p.period_index,
                    SlotAssignment {
                        subject_id: p.subject_id.clone(),
                        staff_id: p.staff_id.clone(),
                    },
                );
            }
        }
    }

    pub fn completeness(&self) -> CompletenessReport {
        let mut empty_by_day: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for col in &self.days {
            let empties: Vec<usize> = col
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_none())
                .map(|(i, _)| i)
                .collect();
            if !empties.is_empty() {
                empty_by_day.insert(col.week_day, empties);
            }
        }
        CompletenessReport {
            complete: empty_by_day.is_empty(),
            empty_by_day,
        }
    }

    /// Map the grid to the wire form. Every non-empty slot emits a period
    /// assignment with its 1-based index; days with zero assignments are
    /// omitted from the payload entirely.
    pub fn to_submission(&self) -> Vec<TimetableDay> {
        let mut out = Vec::new();
        for col in &self.days {
            let periods: Vec<PeriodAssignment> = col
                .slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| {
                    s.as_ref().map(|a| PeriodAssignment {
                        period_index: i + 1,
                        subject_id: a.subject_id.clone(),
                        staff_id: a.staff_id.clone(),
                    })
                })
                .collect();
            if !periods.is_empty() {
                out.push(TimetableDay {
                    week_day: col.week_day,
                    periods,
                });
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub week_day: u8,
    pub period_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    NoClassSelected,
    UnknownGroup,
    BadPeriodCount,
    NotGenerated,
    NoOpenCell,
    CellOutOfGrid {
        week_day: u8,
        period_index: usize,
    },
    FieldErrors {
        subject: Option<&'static str>,
        staff: Option<&'static str>,
    },
    Incomplete(CompletenessReport),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::NoClassSelected => write!(f, "select a class first"),
            EditorError::UnknownGroup => write!(f, "select a working-day group first"),
            EditorError::BadPeriodCount => {
                write!(f, "total periods must be a positive integer")
            }
            EditorError::NotGenerated => write!(f, "generate the table first"),
            EditorError::NoOpenCell => write!(f, "no cell is open"),
            EditorError::CellOutOfGrid {
                week_day,
                period_index,
            } => write!(f, "no such cell: day {} period {}", week_day, period_index),
            EditorError::FieldErrors { .. } => write!(f, "subject and teacher are required"),
            EditorError::Incomplete(_) => write!(f, "the timetable still has empty periods"),
        }
    }
}

impl std::error::Error for EditorError {}

#[derive(Debug)]
enum EditorPhase {
    SelectingParameters,
    Editing {
        group: WorkingDayGroup,
        grid: TimetableGrid,
        open_cell: Option<CellRef>,
    },
}

/// One editor session at a time: the console edits a single grid per user.
/// The session owns the reference data loaded at open and the explicit
/// state record the cell editor and validator act on. Terminal outcomes
/// (successful submit, cancel) drop the whole session.
#[derive(Debug)]
pub struct EditorSession {
    pub school_id: String,
    pub class_id: Option<String>,
    /// Present when editing an existing timetable; submit updates in place.
    pub timetable_id: Option<String>,
    pub groups: Vec<WorkingDayGroup>,
    pub subjects: Vec<SubjectRef>,
    pub staff: Vec<StaffRef>,
    phase: EditorPhase,
}

impl EditorSession {
    pub fn new(
        school_id: String,
        groups: Vec<WorkingDayGroup>,
        subjects: Vec<SubjectRef>,
        staff: Vec<StaffRef>,
    ) -> Self {
        EditorSession {
            school_id,
            class_id: None,
            timetable_id: None,
            groups,
            subjects,
            staff,
            phase: EditorPhase::SelectingParameters,
        }
    }

    pub fn subject(&self, id: &str) -> Option<&SubjectRef> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn staff_member(&self, id: &str) -> Option<&StaffRef> {
        self.staff.iter().find(|s| s.id == id)
    }

    pub fn grid(&self) -> Option<&TimetableGrid> {
        match &self.phase {
            EditorPhase::Editing { grid, .. } => Some(grid),
            EditorPhase::SelectingParameters => None,
        }
    }

    pub fn group(&self) -> Option<&WorkingDayGroup> {
        match &self.phase {
            EditorPhase::Editing { group, .. } => Some(group),
            EditorPhase::SelectingParameters => None,
        }
    }

    pub fn open_cell_ref(&self) -> Option<CellRef> {
        match &self.phase {
            EditorPhase::Editing { open_cell, .. } => *open_cell,
            EditorPhase::SelectingParameters => None,
        }
    }

    /// Generate Table. Replaces any existing grid unconditionally; prior
    /// edits are lost.
    pub fn generate(
        &mut self,
        class_id: &str,
        group_id: &str,
        total_periods: i64,
    ) -> Result<&TimetableGrid, EditorError> {
        if class_id.trim().is_empty() {
            return Err(EditorError::NoClassSelected);
        }
        let group = self
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or(EditorError::UnknownGroup)?;
        let grid = TimetableGrid::generate(&group, total_periods).map_err(|e| match e {
            GridError::BadPeriodCount(_) => EditorError::BadPeriodCount,
            _ => EditorError::UnknownGroup,
        })?;
        self.class_id = Some(class_id.to_string());
        self.phase = EditorPhase::Editing {
            group,
            grid,
            open_cell: None,
        };
        match &self.phase {
            EditorPhase::Editing { grid, .. } => Ok(grid),
            EditorPhase::SelectingParameters => unreachable!(),
        }
    }

    pub fn seed_from(&mut self, days: &[TimetableDay]) -> Result<(), EditorError> {
        match &mut self.phase {
            EditorPhase::Editing { grid, .. } => {
                grid.seed_from(days);
                Ok(())
            }
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }

    /// Open the cell editor on (day, period); returns the current slot so
    /// the pickers can be seeded with the existing selection.
    pub fn open_cell(
        &mut self,
        week_day: u8,
        period_index: usize,
    ) -> Result<Option<SlotAssignment>, EditorError> {
        match &mut self.phase {
            EditorPhase::Editing {
                grid, open_cell, ..
            } => {
                let current = grid
                    .slot(week_day, period_index)
                    .map_err(|_| EditorError::CellOutOfGrid {
                        week_day,
                        period_index,
                    })?
                    .cloned();
                *open_cell = Some(CellRef {
                    week_day,
                    period_index,
                });
                Ok(current)
            }
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }

    /// Save the open cell. Both pickers must name a known entity; otherwise
    /// per-field errors come back and the cell stays open. No partial save.
    pub fn save_cell(&mut self, subject_id: &str, staff_id: &str) -> Result<CellRef, EditorError> {
        let subject_err = if subject_id.trim().is_empty() {
            Some("select a subject")
        } else if self.subject(subject_id).is_none() {
            Some("unknown subject")
        } else {
            None
        };
        let staff_err = if staff_id.trim().is_empty() {
            Some("select a teacher")
        } else if self.staff_member(staff_id).is_none() {
            Some("unknown teacher")
        } else {
            None
        };

        match &mut self.phase {
            EditorPhase::Editing {
                grid, open_cell, ..
            } => {
                let cell = open_cell.ok_or(EditorError::NoOpenCell)?;
                if subject_err.is_some() || staff_err.is_some() {
                    return Err(EditorError::FieldErrors {
                        subject: subject_err,
                        staff: staff_err,
                    });
                }
                grid.set_slot(
                    cell.week_day,
                    cell.period_index,
                    SlotAssignment {
                        subject_id: subject_id.to_string(),
                        staff_id: staff_id.to_string(),
                    },
                )
                .map_err(|_| EditorError::CellOutOfGrid {
                    week_day: cell.week_day,
                    period_index: cell.period_index,
                })?;
                *open_cell = None;
                Ok(cell)
            }
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }

    pub fn cancel_cell(&mut self) -> Result<(), EditorError> {
        match &mut self.phase {
            EditorPhase::Editing { open_cell, .. } => {
                *open_cell = None;
                Ok(())
            }
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }

    pub fn validate(&self) -> Result<CompletenessReport, EditorError> {
        match &self.phase {
            EditorPhase::Editing { grid, .. } => Ok(grid.completeness()),
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }

    /// Submission payload for a validated grid. Incomplete grids are
    /// rejected with the empty-cell map so the UI can highlight them.
    pub fn submission(&self) -> Result<Vec<TimetableDay>, EditorError> {
        match &self.phase {
            EditorPhase::Editing { grid, .. } => {
                let report = grid.completeness();
                if !report.complete {
                    return Err(EditorError::Incomplete(report));
                }
                Ok(grid.to_submission())
            }
            EditorPhase::SelectingParameters => Err(EditorError::NotGenerated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_day_group() -> WorkingDayGroup {
        WorkingDayGroup {
            id: "wdg-1".to_string(),
            group_name: "5-day week".to_string(),
            days: vec![1, 2, 3, 4, 5],
        }
    }

    fn session() -> EditorSession {
        EditorSession::new(
            "school-1".to_string(),
            vec![five_day_group()],
            vec![
                SubjectRef {
                    id: "sub-math".to_string(),
                    name: "Math".to_string(),
                },
                SubjectRef {
                    id: "sub-sci".to_string(),
                    name: "Science".to_string(),
                },
            ],
            vec![
                StaffRef {
                    id: "stf-doe".to_string(),
                    name: "J. Doe".to_string(),
                    registration_no: "REG-1001".to_string(),
                },
                StaffRef {
                    id: "stf-roe".to_string(),
                    name: "R. Roe".to_string(),
                    registration_no: "REG-2002".to_string(),
                },
            ],
        )
    }

    #[test]
    fn generate_produces_n_days_by_p_empty_slots() {
        let grid = TimetableGrid::generate(&five_day_group(), 3).expect("generate");
        assert_eq!(grid.days().len(), 5);
        let empties: usize = grid
            .days()
            .iter()
            .map(|c| c.slots.iter().filter(|s| s.is_none()).count())
            .sum();
        assert_eq!(empties, 15);
        assert_eq!(grid.days()[0].week_day, 1);
        assert_eq!(day_name(grid.days()[0].week_day), Some("Monday"));
        assert_eq!(day_name(grid.days()[4].week_day), Some("Friday"));
    }

    #[test]
    fn generate_rejects_non_positive_period_counts() {
        assert!(matches!(
            TimetableGrid::generate(&five_day_group(), 0),
            Err(GridError::BadPeriodCount(0))
        ));
        assert!(matches!(
            TimetableGrid::generate(&five_day_group(), -2),
            Err(GridError::BadPeriodCount(-2))
        ));
    }

    #[test]
    fn generate_rejects_out_of_range_days() {
        let group = WorkingDayGroup {
            id: "wdg-x".to_string(),
            group_name: "broken".to_string(),
            days: vec![1, 8],
        };
        assert!(matches!(
            TimetableGrid::generate(&group, 2),
            Err(GridError::BadWeekDay(8))
        ));
    }

    #[test]
    fn validator_scenario_monday_partially_filled() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 3).expect("generate");
        s.open_cell(1, 1).expect("open");
        s.save_cell("sub-math", "stf-doe").expect("save");

        let report = s.validate().expect("validate");
        assert!(!report.complete);
        assert_eq!(report.empty_by_day.get(&1), Some(&vec![1, 2]));
        assert_eq!(report.empty_by_day.get(&2), Some(&vec![0, 1, 2]));

        // The display label for the filled cell keeps the Subject/Teacher form.
        let slot = s
            .grid()
            .expect("grid")
            .slot(1, 1)
            .expect("slot")
            .cloned()
            .expect("filled");
        let subject = s.subject(&slot.subject_id).expect("subject");
        let staff = s.staff_member(&slot.staff_id).expect("staff");
        assert_eq!(slot_label(&subject.name, &staff.name), "Math/J. Doe");
    }

    #[test]
    fn validator_complete_iff_every_slot_filled() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 2).expect("generate");
        for day in 1..=5u8 {
            for period in 1..=2usize {
                s.open_cell(day, period).expect("open");
                s.save_cell("sub-math", "stf-doe").expect("save");
            }
        }
        let report = s.validate().expect("validate");
        assert!(report.complete);
        assert!(report.empty_by_day.is_empty());
    }

    #[test]
    fn save_cell_is_idempotent() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 3).expect("generate");
        s.open_cell(2, 2).expect("open");
        s.save_cell("sub-sci", "stf-roe").expect("save");
        let first = s.grid().unwrap().slot(2, 2).unwrap().cloned();
        s.open_cell(2, 2).expect("reopen");
        s.save_cell("sub-sci", "stf-roe").expect("save again");
        let second = s.grid().unwrap().slot(2, 2).unwrap().cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn save_cell_reports_per_field_errors_and_keeps_cell_open() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 3).expect("generate");
        s.open_cell(1, 1).expect("open");

        let err = s.save_cell("", "").expect_err("must fail");
        match err {
            EditorError::FieldErrors { subject, staff } => {
                assert!(subject.is_some());
                assert!(staff.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Still open: a corrected save goes through without reopening.
        assert!(s.open_cell_ref().is_some());
        s.save_cell("sub-math", "stf-doe").expect("corrected save");
        assert!(s.open_cell_ref().is_none());
    }

    #[test]
    fn save_cell_rejects_unknown_ids() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 1).expect("generate");
        s.open_cell(3, 1).expect("open");
        let err = s.save_cell("sub-nope", "stf-doe").expect_err("must fail");
        match err {
            EditorError::FieldErrors { subject, staff } => {
                assert_eq!(subject, Some("unknown subject"));
                assert_eq!(staff, None);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn generate_overwrites_prior_edits() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 2).expect("generate");
        s.open_cell(1, 1).expect("open");
        s.save_cell("sub-math", "stf-doe").expect("save");
        s.generate("class-1", "wdg-1", 2).expect("regenerate");
        assert!(s.grid().unwrap().slot(1, 1).unwrap().is_none());
    }

    #[test]
    fn mapper_omits_a_day_iff_all_its_slots_are_empty() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 2).expect("generate");
        // Fill everything except Tuesday (week day 2).
        for day in [1u8, 3, 4, 5] {
            for period in 1..=2usize {
                s.open_cell(day, period).expect("open");
                s.save_cell("sub-math", "stf-doe").expect("save");
            }
        }
        let days = s.grid().unwrap().to_submission();
        assert_eq!(days.len(), 4);
        let week_days: Vec<u8> = days.iter().map(|d| d.week_day).collect();
        assert_eq!(week_days, vec![1, 3, 4, 5]);
        assert!(days.iter().all(|d| d.periods.len() == 2));
        assert_eq!(days[0].periods[0].period_index, 1);
        assert_eq!(days[0].periods[1].period_index, 2);
    }

    #[test]
    fn mapper_skips_empty_slots_within_a_day() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 3).expect("generate");
        s.open_cell(1, 2).expect("open");
        s.save_cell("sub-sci", "stf-roe").expect("save");
        let days = s.grid().unwrap().to_submission();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].week_day, 1);
        assert_eq!(
            days[0].periods,
            vec![PeriodAssignment {
                period_index: 2,
                subject_id: "sub-sci".to_string(),
                staff_id: "stf-roe".to_string(),
            }]
        );
    }

    #[test]
    fn submission_is_gated_on_completeness() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 1).expect("generate");
        match s.submission() {
            Err(EditorError::Incomplete(report)) => {
                assert_eq!(report.empty_by_day.len(), 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
        for day in 1..=5u8 {
            s.open_cell(day, 1).expect("open");
            s.save_cell("sub-math", "stf-doe").expect("save");
        }
        let days = s.submission().expect("complete grid submits");
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn editor_rejects_operations_out_of_phase() {
        let mut s = session();
        assert_eq!(s.open_cell(1, 1), Err(EditorError::NotGenerated));
        assert_eq!(
            s.save_cell("sub-math", "stf-doe"),
            Err(EditorError::NotGenerated)
        );
        assert!(matches!(s.validate(), Err(EditorError::NotGenerated)));

        s.generate("class-1", "wdg-1", 1).expect("generate");
        assert_eq!(
            s.save_cell("sub-math", "stf-doe"),
            Err(EditorError::NoOpenCell)
        );
        assert_eq!(
            s.open_cell(6, 1),
            Err(EditorError::CellOutOfGrid {
                week_day: 6,
                period_index: 1
            })
        );
    }

    #[test]
    fn generate_requires_class_and_known_group() {
        let mut s = session();
        assert_eq!(
            s.generate("", "wdg-1", 3).err(),
            Some(EditorError::NoClassSelected)
        );
        assert_eq!(
            s.generate("class-1", "wdg-missing", 3).err(),
            Some(EditorError::UnknownGroup)
        );
        assert_eq!(
            s.generate("class-1", "wdg-1", 0).err(),
            Some(EditorError::BadPeriodCount)
        );
    }

    #[test]
    fn seed_from_restores_stored_assignments() {
        let mut s = session();
        s.generate("class-1", "wdg-1", 2).expect("generate");
        s.seed_from(&[TimetableDay {
            week_day: 3,
            periods: vec![PeriodAssignment {
                period_index: 2,
                subject_id: "sub-sci".to_string(),
                staff_id: "stf-roe".to_string(),
            }],
        }])
        .expect("seed");
        let slot = s.grid().unwrap().slot(3, 2).unwrap().cloned().unwrap();
        assert_eq!(slot.subject_id, "sub-sci");
        // Out-of-shape entries are skipped, not errors.
        s.seed_from(&[TimetableDay {
            week_day: 6,
            periods: vec![PeriodAssignment {
                period_index: 9,
                subject_id: "sub-math".to_string(),
                staff_id: "stf-doe".to_string(),
            }],
        }])
        .expect("seed ignores out-of-shape");
    }

    #[test]
    fn subject_search_is_case_insensitive_substring() {
        let subjects = vec![
            SubjectRef {
                id: "s1".to_string(),
                name: "Mathematics".to_string(),
            },
            SubjectRef {
                id: "s2".to_string(),
                name: "Chemistry".to_string(),
            },
        ];
        let hits = filter_subjects(&subjects, "math");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "s1");
        assert_eq!(filter_subjects(&subjects, "").len(), 2);
        assert_eq!(filter_subjects(&subjects, "EMIS").len(), 1);
    }

    #[test]
    fn staff_search_matches_name_or_registration_no() {
        let staff = vec![
            StaffRef {
                id: "t1".to_string(),
                name: "Jane Doe".to_string(),
                registration_no: "REG-1001".to_string(),
            },
            StaffRef {
                id: "t2".to_string(),
                name: "Rex Roe".to_string(),
                registration_no: "REG-2002".to_string(),
            },
        ];
        assert_eq!(filter_staff(&staff, "jane").len(), 1);
        assert_eq!(filter_staff(&staff, "2002").len(), 1);
        assert_eq!(filter_staff(&staff, "2002")[0].id, "t2");
        assert_eq!(filter_staff(&staff, "REG-").len(), 2);
        assert_eq!(filter_staff(&staff, "").len(), 2);
    }

    #[test]
    fn day_set_validation() {
        assert!(validate_day_set(&[1, 2, 3, 4, 5]).is_ok());
        assert!(validate_day_set(&[6, 7]).is_ok());
        assert!(validate_day_set(&[]).is_err());
        assert!(validate_day_set(&[0]).is_err());
        assert!(validate_day_set(&[1, 1]).is_err());
        assert!(validate_day_set(&[3, 8]).is_err());
    }
}
