use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::common::{ballot::CandidateId, Course};

/// The live election summary.
///
/// An election with no registered voters has no meaningful turnout, so that
/// case is an explicit variant rather than a zero-filled artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ElectionSummary {
    /// No voters are registered yet.
    NoData,
    /// Turnout and totals over the registered voters.
    Results(ElectionTotals),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionTotals {
    /// Number of registered voters.
    pub total_voters: u64,
    /// Number of voters who have cast a ballot.
    pub total_voted: u64,
    /// Turnout per course. Courses with no members report a rate of 0.
    pub participation: HashMap<Course, CourseParticipation>,
    /// Per-candidate totals, stratified by course.
    pub candidates: HashMap<CandidateId, CandidateTally>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseParticipation {
    pub total: u64,
    pub voted: u64,
    /// `voted / total`, or 0 when the course has no members.
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTally {
    /// Sum over all courses.
    pub total: u64,
    /// Per-course counts; never-incremented pairs are absent, i.e. zero.
    pub by_course: HashMap<Course, u64>,
}
