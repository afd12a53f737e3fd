//! # Sample Points
//!
//! Locations where samples are collected, with optional coordinates, an
//! elevation, a sampling frequency and the sample types collectable there.
//! The SamplePoint ↔ SampleType relation is kept symmetric on assignment.

use crate::constants::portal_types;
use crate::error::{LimsError, LimsResult};
use crate::models::fields::{value_to_uids, Content, FieldDescriptor, FieldValues};
use crate::models::ids::Uid;
use crate::state_machine::history::TransitionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const SAMPLE_POINT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::stored("id"),
    FieldDescriptor::stored("title"),
    FieldDescriptor::stored("description"),
    FieldDescriptor::stored("Latitude"),
    FieldDescriptor::stored("Longitude"),
    FieldDescriptor::stored("Elevation"),
    FieldDescriptor::stored("SamplingFrequency"),
    FieldDescriptor::stored("SampleTypes"),
    FieldDescriptor::stored("Composite"),
    FieldDescriptor::stored("AttachmentFile"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bearing {
    N,
    S,
    E,
    W,
}

/// Degrees/minutes/seconds coordinate with hemisphere indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub degrees: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub bearing: Bearing,
}

impl Coordinate {
    pub fn latitude(degrees: u16, minutes: u8, seconds: u8, bearing: Bearing) -> LimsResult<Self> {
        if !matches!(bearing, Bearing::N | Bearing::S) {
            return Err(LimsError::Validation(
                "Latitude bearing must be N or S".to_string(),
            ));
        }
        Self::checked(degrees, 90, minutes, seconds, bearing)
    }

    pub fn longitude(
        degrees: u16,
        minutes: u8,
        seconds: u8,
        bearing: Bearing,
    ) -> LimsResult<Self> {
        if !matches!(bearing, Bearing::E | Bearing::W) {
            return Err(LimsError::Validation(
                "Longitude bearing must be E or W".to_string(),
            ));
        }
        Self::checked(degrees, 180, minutes, seconds, bearing)
    }

    fn checked(
        degrees: u16,
        max_degrees: u16,
        minutes: u8,
        seconds: u8,
        bearing: Bearing,
    ) -> LimsResult<Self> {
        if degrees > max_degrees {
            return Err(LimsError::Validation(format!(
                "Degrees must be within 0-{max_degrees}, got {degrees}"
            )));
        }
        if minutes > 59 || seconds > 59 {
            return Err(LimsError::Validation(format!(
                "Minutes and seconds must be within 0-59, got {minutes}'{seconds}\""
            )));
        }
        Ok(Self {
            degrees,
            minutes,
            seconds,
            bearing,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}° {}' {}\" {:?}",
            self.degrees, self.minutes, self.seconds, self.bearing
        )
    }
}

/// How often samples are taken at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SamplingFrequency {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl SamplingFrequency {
    pub fn total_minutes(&self) -> u64 {
        u64::from(self.days) * 24 * 60 + u64::from(self.hours) * 60 + u64::from(self.minutes)
    }
}

/// Kind of matrix a sample consists of, tracking where it can be collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleType {
    pub uid: Uid,
    pub title: String,
    #[serde(default)]
    pub sample_points: Vec<Uid>,
}

impl SampleType {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            uid: Uid::generate(),
            title: title.into(),
            sample_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    uid: Uid,
    #[serde(default)]
    fields: FieldValues,
    #[serde(default)]
    workflow_history: Vec<TransitionRecord>,
}

impl SamplePoint {
    pub fn new(uid: Uid, title: impl Into<String>) -> Self {
        let mut fields = FieldValues::new();
        fields.insert("title".to_string(), Value::String(title.into()));
        fields.insert("Composite".to_string(), Value::Bool(false));
        Self {
            uid,
            fields,
            workflow_history: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        self.get_field("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn latitude(&self) -> Option<Coordinate> {
        self.typed_field("Latitude")
    }

    pub fn set_latitude(&mut self, coordinate: Coordinate) {
        self.set_typed_field("Latitude", &coordinate);
    }

    pub fn longitude(&self) -> Option<Coordinate> {
        self.typed_field("Longitude")
    }

    pub fn set_longitude(&mut self, coordinate: Coordinate) {
        self.set_typed_field("Longitude", &coordinate);
    }

    pub fn elevation(&self) -> Option<&str> {
        self.get_field("Elevation").and_then(Value::as_str)
    }

    pub fn set_elevation(&mut self, elevation: impl Into<String>) {
        self.set_field("Elevation", Value::String(elevation.into()));
    }

    pub fn sampling_frequency(&self) -> Option<SamplingFrequency> {
        self.typed_field("SamplingFrequency")
    }

    pub fn set_sampling_frequency(&mut self, frequency: SamplingFrequency) {
        self.set_typed_field("SamplingFrequency", &frequency);
    }

    /// Whether samples here are composites of several sub-samples rather
    /// than single grab samples
    pub fn is_composite(&self) -> bool {
        self.get_field("Composite")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_composite(&mut self, composite: bool) {
        self.set_field("Composite", Value::Bool(composite));
    }

    pub fn sample_type_uids(&self) -> Vec<Uid> {
        value_to_uids(self.get_field("SampleTypes"))
    }

    /// Assign the collectable sample types, updating the reverse relation on
    /// every sample type that was added or removed
    pub fn set_sample_types(
        &mut self,
        values: &[Uid],
        sample_types: &mut BTreeMap<Uid, SampleType>,
    ) -> LimsResult<()> {
        let mut assigned: Vec<Uid> = Vec::with_capacity(values.len());
        for uid in values {
            if !sample_types.contains_key(uid) {
                return Err(LimsError::not_found(portal_types::SAMPLE_TYPE, uid));
            }
            if !assigned.contains(uid) {
                assigned.push(uid.clone());
            }
        }

        let existing = self.sample_type_uids();
        let removed: Vec<&Uid> = existing.iter().filter(|uid| !assigned.contains(uid)).collect();
        let added: Vec<&Uid> = assigned.iter().filter(|uid| !existing.contains(uid)).collect();

        for uid in removed {
            if let Some(sample_type) = sample_types.get_mut(uid) {
                sample_type.sample_points.retain(|point| point != &self.uid);
            }
        }

        for uid in added {
            if let Some(sample_type) = sample_types.get_mut(uid) {
                if !sample_type.sample_points.contains(&self.uid) {
                    sample_type.sample_points.push(self.uid.clone());
                }
            }
        }

        let value = Value::Array(
            assigned
                .iter()
                .map(|uid| Value::String(uid.to_string()))
                .collect(),
        );
        self.set_field("SampleTypes", value);
        Ok(())
    }

    fn typed_field<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.get_field(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    fn set_typed_field<T: Serialize>(&mut self, name: &str, value: &T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.set_field(name, value);
        }
    }
}

impl Content for SamplePoint {
    fn uid(&self) -> &Uid {
        &self.uid
    }

    fn portal_type(&self) -> &'static str {
        portal_types::SAMPLE_POINT
    }

    fn manifest(&self) -> &'static [FieldDescriptor] {
        SAMPLE_POINT_FIELDS
    }

    fn field_values(&self) -> &FieldValues {
        &self.fields
    }

    fn field_values_mut(&mut self) -> &mut FieldValues {
        &mut self.fields
    }

    fn workflow_history(&self) -> &[TransitionRecord] {
        &self.workflow_history
    }

    fn workflow_history_mut(&mut self) -> &mut Vec<TransitionRecord> {
        &mut self.workflow_history
    }
}
