//! Relational form of the survey tree.
//!
//! Surveys, sections and points are stored as three flat row lists linked by
//! integer ids. Ids are assigned on save in tree order starting at 1; row
//! order within a table is the tree order, and is restored on load.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::survey::{DeviceProperties, Point, Section, Survey};

use super::error::{ProjectError, ProjectResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub id: u32,
    pub device_name: String,
    pub survey_datetime: DateTime<Utc>,
    pub survey_name: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRow {
    pub id: u32,
    pub survey_id: u32,
    pub section_reference_id: u16,
    pub device_properties: DeviceProperties,
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    pub id: u32,
    pub section_id: u32,
    pub point_reference_id: u32,
    pub section_reference_id: u16,
    pub depth: f64,
    pub temperature: f64,
    pub azimuth_in: f64,
    pub azimuth_out: f64,
    pub length_in: f64,
    pub length_out: f64,
    pub name: String,
    pub comment: String,
}

/// All rows of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTables {
    pub surveys: Vec<SurveyRow>,
    pub sections: Vec<SectionRow>,
    pub points: Vec<PointRow>,
}

impl ProjectTables {
    /// Flattens survey trees into rows.
    pub fn from_surveys(surveys: &[Survey]) -> Self {
        let mut tables = Self::default();

        for survey in surveys {
            let survey_id = tables.surveys.len() as u32 + 1;
            tables.surveys.push(SurveyRow {
                id: survey_id,
                device_name: survey.device_name.clone(),
                survey_datetime: survey.survey_datetime,
                survey_name: survey.survey_name.clone(),
                comment: survey.comment.clone(),
            });

            for section in &survey.sections {
                let section_id = tables.sections.len() as u32 + 1;
                tables.sections.push(SectionRow {
                    id: section_id,
                    survey_id,
                    section_reference_id: section.section_reference_id,
                    device_properties: section.device_properties.clone(),
                    name: section.name.clone(),
                    comment: section.comment.clone(),
                });

                for point in &section.points {
                    tables.points.push(PointRow {
                        id: tables.points.len() as u32 + 1,
                        section_id,
                        point_reference_id: point.point_reference_id,
                        section_reference_id: point.section_reference_id,
                        depth: point.depth,
                        temperature: point.temperature,
                        azimuth_in: point.azimuth_in,
                        azimuth_out: point.azimuth_out,
                        length_in: point.length_in,
                        length_out: point.length_out,
                        name: point.name.clone(),
                        comment: point.comment.clone(),
                    });
                }
            }
        }

        tables
    }

    /// Rebuilds survey trees, failing on rows whose parent is missing.
    pub fn into_surveys(self) -> ProjectResult<Vec<Survey>> {
        let mut surveys: Vec<Survey> = Vec::with_capacity(self.surveys.len());
        let mut survey_index: HashMap<u32, usize> = HashMap::new();
        for row in self.surveys {
            let mut survey = Survey::new(row.device_name, row.survey_datetime);
            survey.survey_name = row.survey_name;
            survey.comment = row.comment;
            if survey_index.insert(row.id, surveys.len()).is_some() {
                return Err(ProjectError::Corrupt(format!("duplicate survey id {}", row.id)));
            }
            surveys.push(survey);
        }

        // (survey slot, section slot) for each section id
        let mut section_index: HashMap<u32, (usize, usize)> = HashMap::new();
        for row in self.sections {
            let &slot = survey_index.get(&row.survey_id).ok_or_else(|| {
                ProjectError::Corrupt(format!(
                    "section {} references missing survey {}",
                    row.id, row.survey_id
                ))
            })?;
            let mut section = Section::new(row.section_reference_id, row.device_properties);
            section.name = row.name;
            section.comment = row.comment;

            let sections = &mut surveys[slot].sections;
            if section_index.insert(row.id, (slot, sections.len())).is_some() {
                return Err(ProjectError::Corrupt(format!("duplicate section id {}", row.id)));
            }
            sections.push(section);
        }

        for row in self.points {
            let &(survey_slot, section_slot) =
                section_index.get(&row.section_id).ok_or_else(|| {
                    ProjectError::Corrupt(format!(
                        "point {} references missing section {}",
                        row.id, row.section_id
                    ))
                })?;
            surveys[survey_slot].sections[section_slot]
                .points
                .push(Point {
                    point_reference_id: row.point_reference_id,
                    section_reference_id: row.section_reference_id,
                    depth: row.depth,
                    temperature: row.temperature,
                    azimuth_in: row.azimuth_in,
                    azimuth_out: row.azimuth_out,
                    length_in: row.length_in,
                    length_out: row.length_out,
                    name: row.name,
                    comment: row.comment,
                });
        }

        Ok(surveys)
    }
}
