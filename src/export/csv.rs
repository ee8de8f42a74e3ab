//! CSV record families (HRV, SpO2, stress, sleep score, profile, exercises)

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::path::Path;

use super::{write_failed, ISO_MS_FMT};
use crate::config::ProfileConfig;
use crate::error::ExportError;
use crate::models::{start_of_day, DailyDerivedMetrics, ExerciseSession, SleepScore};

/// Write `rows` with a header derived from the row type
pub fn write_csv<T, P>(rows: &[T], path: P) -> Result<(), ExportError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(write_failed(path))?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct HrvRow {
    pub timestamp: String,
    pub rmssd: f64,
    pub nremhr: u16,
    pub entropy: f64,
}

impl From<&DailyDerivedMetrics> for HrvRow {
    fn from(m: &DailyDerivedMetrics) -> Self {
        HrvRow {
            timestamp: start_of_day(m.date).format("%Y-%m-%dT%H:%M:%S").to_string(),
            rmssd: m.hrv.rmssd,
            nremhr: m.hrv.nremhr,
            entropy: m.hrv.entropy,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpO2Row {
    pub timestamp: String,
    pub average_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl From<&DailyDerivedMetrics> for SpO2Row {
    fn from(m: &DailyDerivedMetrics) -> Self {
        SpO2Row {
            timestamp: start_of_day(m.date).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            average_value: m.spo2.average,
            lower_bound: m.spo2.lower_bound,
            upper_bound: m.spo2.upper_bound,
        }
    }
}

pub const MAX_SLEEP_POINTS: u8 = 30;
pub const MAX_RESPONSIVENESS_POINTS: u8 = 30;
pub const MAX_EXERTION_POINTS: u8 = 40;

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StressRow {
    pub date: String,
    pub updated_at: String,
    pub stress_score: u8,
    pub sleep_points: u8,
    pub max_sleep_points: u8,
    pub responsiveness_points: u8,
    pub max_responsiveness_points: u8,
    pub exertion_points: u8,
    pub max_exertion_points: u8,
    pub status: &'static str,
    pub calculation_failed: &'static str,
}

impl From<&DailyDerivedMetrics> for StressRow {
    fn from(m: &DailyDerivedMetrics) -> Self {
        let midnight = start_of_day(m.date);
        StressRow {
            date: midnight.format("%Y-%m-%dT%H:%M:%S").to_string(),
            updated_at: (midnight + Duration::hours(8)).format(ISO_MS_FMT).to_string(),
            stress_score: m.stress.score,
            sleep_points: m.stress.sleep_points,
            max_sleep_points: MAX_SLEEP_POINTS,
            responsiveness_points: m.stress.responsiveness_points,
            max_responsiveness_points: MAX_RESPONSIVENESS_POINTS,
            exertion_points: m.stress.exertion_points,
            max_exertion_points: MAX_EXERTION_POINTS,
            status: "READY",
            calculation_failed: "false",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SleepScoreRow {
    pub sleep_log_entry_id: u64,
    pub timestamp: String,
    pub overall_score: u8,
    pub composition_score: u8,
    pub revitalization_score: u8,
    pub duration_score: u8,
    pub deep_sleep_in_minutes: u32,
    pub resting_heart_rate: u16,
    pub restlessness: f64,
}

impl From<&SleepScore> for SleepScoreRow {
    fn from(s: &SleepScore) -> Self {
        SleepScoreRow {
            sleep_log_entry_id: s.sleep_log_id,
            timestamp: s.timestamp.format(ISO_MS_FMT).to_string(),
            overall_score: s.overall,
            composition_score: s.composition,
            revitalization_score: s.revitalization,
            duration_score: s.duration,
            deep_sleep_in_minutes: s.deep_sleep_minutes,
            resting_heart_rate: s.resting_heart_rate,
            restlessness: s.restlessness,
        }
    }
}

/// Single-row `Profile.csv`
#[derive(Debug, Serialize)]
pub struct ProfileRow<'a> {
    pub id: &'a str,
    pub full_name: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub display_name_setting: &'static str,
    pub display_name: &'a str,
    pub username: &'static str,
    pub email_address: &'a str,
    pub date_of_birth: String,
    pub child: &'static str,
    pub country: &'static str,
    pub state: &'static str,
    pub city: &'static str,
    pub timezone: &'a str,
    pub locale: &'static str,
    pub member_since: String,
    pub about_me: &'static str,
    pub start_of_week: &'static str,
    pub sleep_tracking: &'static str,
    pub time_display_format: &'static str,
    pub gender: &'a str,
    pub height: f64,
    pub weight: f64,
    pub stride_length_walking: f64,
    pub stride_length_running: f64,
    pub weight_unit: &'static str,
    pub distance_unit: &'static str,
    pub height_unit: &'static str,
    pub water_unit: &'static str,
    pub glucose_unit: &'static str,
    pub swim_unit: &'static str,
}

impl<'a> From<&'a ProfileConfig> for ProfileRow<'a> {
    fn from(p: &'a ProfileConfig) -> Self {
        ProfileRow {
            id: &p.id,
            full_name: &p.full_name,
            first_name: p.first_name(),
            last_name: p.last_name(),
            display_name_setting: "name",
            display_name: &p.full_name,
            username: "null",
            email_address: &p.email,
            date_of_birth: p.date_of_birth.format("%Y-%m-%d").to_string(),
            child: "false",
            country: "null",
            state: "null",
            city: "null",
            timezone: &p.timezone,
            locale: "en_US",
            member_since: p.member_since.format("%Y-%m-%d").to_string(),
            about_me: "null",
            start_of_week: "MONDAY",
            sleep_tracking: "Normal",
            time_display_format: "24hour",
            gender: &p.gender,
            height: p.height_cm,
            weight: p.weight_kg,
            stride_length_walking: p.stride_length_walking_cm,
            stride_length_running: p.stride_length_running_cm,
            weight_unit: "METRIC",
            distance_unit: "METRIC",
            height_unit: "METRIC",
            water_unit: "en_US",
            glucose_unit: "en_US",
            swim_unit: "METRIC",
        }
    }
}

/// Legacy wide `UserExercises.csv` row; distances in millimetres
#[derive(Debug, Serialize)]
pub struct UserExerciseRow {
    pub exercise_id: u64,
    pub exercise_start: String,
    pub exercise_end: String,
    pub utc_offset: &'static str,
    pub exercise_created: String,
    pub exercise_last_updated: String,
    pub activity_name: &'static str,
    pub log_type: &'static str,
    pub tracker_total_calories: u32,
    pub tracker_total_steps: u32,
    pub tracker_total_distance_mm: u64,
    pub tracker_total_altitude_mm: u64,
    pub tracker_avg_heart_rate: u16,
    pub tracker_peak_heart_rate: u16,
    pub tracker_avg_speed_mm_per_second: u64,
    pub tracker_active_zone_minutes: u32,
}

impl From<&ExerciseSession> for UserExerciseRow {
    fn from(s: &ExerciseSession) -> Self {
        let distance_mm = (s.distance_km.to_f64().unwrap_or(0.0) * 1_000_000.0).round() as u64;
        let seconds = u64::from(s.duration_minutes.max(1)) * 60;
        let speed = distance_mm / seconds;
        let end = s.end.format(ISO_MS_FMT).to_string();

        UserExerciseRow {
            exercise_id: s.log_id,
            exercise_start: s.start.format(ISO_MS_FMT).to_string(),
            exercise_end: end.clone(),
            utc_offset: "+00:00",
            exercise_created: end.clone(),
            exercise_last_updated: end,
            activity_name: s.kind.display_name(),
            log_type: "auto_detected",
            tracker_total_calories: s.calories,
            tracker_total_steps: s.steps,
            tracker_total_distance_mm: distance_mm,
            tracker_total_altitude_mm: 0,
            tracker_avg_heart_rate: s.avg_hr,
            tracker_peak_heart_rate: s.peak_hr,
            tracker_avg_speed_mm_per_second: speed,
            tracker_active_zone_minutes: s.hr_zone_minutes.active_zone_minutes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActivityKind, ActivityLevelMinutes, DayLoad, HrvSummary, RestingHeartRate, SpO2Summary,
        StressScore, ZoneMinutes,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn metrics() -> DailyDerivedMetrics {
        DailyDerivedMetrics {
            date: NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(),
            load: DayLoad::Rest,
            resting_hr: RestingHeartRate { value: 58.0, error: 9.5 },
            hrv: HrvSummary { rmssd: 44.512, baseline: 56.0, nremhr: 57, entropy: 1.402 },
            spo2: SpO2Summary { average: 96.9, lower_bound: 95.4, upper_bound: 98.1 },
            stress: StressScore { score: 71, sleep_points: 24, responsiveness_points: 27, exertion_points: 35 },
            sleep_score: None,
            whole_day_zones: ZoneMinutes { out_of_range: 1400, fat_burn: 30, cardio: 10, peak: 0 },
        }
    }

    #[test]
    fn test_stress_csv_header_and_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Stress Score.csv");
        write_csv(&[StressRow::from(&metrics())], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DATE,UPDATED_AT,STRESS_SCORE,SLEEP_POINTS,MAX_SLEEP_POINTS,RESPONSIVENESS_POINTS,MAX_RESPONSIVENESS_POINTS,EXERTION_POINTS,MAX_EXERTION_POINTS,STATUS,CALCULATION_FAILED"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2026-01-22T00:00:00,2026-01-22T08:00:00.000,71,24,30,27,30,35,40,READY,false"
        );
    }

    #[test]
    fn test_hrv_and_spo2_rows() {
        let dir = TempDir::new().unwrap();
        let hrv = dir.path().join("hrv.csv");
        write_csv(&[HrvRow::from(&metrics())], &hrv).unwrap();
        let content = std::fs::read_to_string(&hrv).unwrap();
        assert!(content.starts_with("timestamp,rmssd,nremhr,entropy\n"));
        assert!(content.contains("2026-01-22T00:00:00,44.512,57,1.402"));

        let spo2 = dir.path().join("spo2.csv");
        write_csv(&[SpO2Row::from(&metrics())], &spo2).unwrap();
        let content = std::fs::read_to_string(&spo2).unwrap();
        assert!(content.contains("2026-01-22T00:00:00Z,96.9,95.4,98.1"));
    }

    #[test]
    fn test_profile_has_fixed_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Profile.csv");
        let profile = ProfileConfig::default();
        write_csv(&[ProfileRow::from(&profile)], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 31);
        assert_eq!(&headers[0], "id");
        assert_eq!(&headers[30], "swim_unit");
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "Demo");
        assert_eq!(&row[3], "User");
    }

    #[test]
    fn test_user_exercise_distance_in_millimetres() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let session = ExerciseSession {
            log_id: 48_000_000_000,
            day_offset: 0,
            kind: ActivityKind::Run,
            start: date.and_hms_opt(7, 15, 0).unwrap(),
            end: date.and_hms_opt(7, 53, 0).unwrap(),
            duration_minutes: 38,
            calories: 437,
            steps: 6190,
            distance_km: dec!(6.38),
            avg_hr: 151,
            peak_hr: 169,
            hr_zone_minutes: ZoneMinutes { out_of_range: 3, fat_burn: 10, cardio: 19, peak: 6 },
            activity_level_minutes: ActivityLevelMinutes { sedentary: 3, lightly: 4, fairly: 13, very: 18 },
        };
        let row = UserExerciseRow::from(&session);
        assert_eq!(row.tracker_total_distance_mm, 6_380_000);
        assert_eq!(row.tracker_avg_speed_mm_per_second, 6_380_000 / (38 * 60));
        assert_eq!(row.exercise_start, "2026-01-20T07:15:00.000");
        assert_eq!(row.activity_name, "Run");
    }
}
