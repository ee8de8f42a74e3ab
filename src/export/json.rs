//! JSON record families of the `Global Export Data` folder

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{write_failed, DATE_TIME_FMT, DAY_FMT, ISO_MS_FMT};
use crate::error::ExportError;
use crate::exercise::zone_bands;
use crate::models::{
    start_of_day, ActivityMinute, DailyDerivedMetrics, ExerciseSession, HeartRateSample, SleepWindow,
    ZoneMinutes,
};

/// Serialize `data` to `path`, pretty-printed or compact
pub fn write_json<T, P>(data: &T, path: P, pretty: bool) -> Result<(), ExportError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(write_failed(path))?;
    let mut writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(&mut writer, data)?;
    } else {
        serde_json::to_writer(&mut writer, data)?;
    }
    writer.flush().map_err(write_failed(path))?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateRecord {
    pub date_time: String,
    pub value: HeartRateValue,
}

#[derive(Debug, Serialize)]
pub struct HeartRateValue {
    pub bpm: u16,
    pub confidence: u8,
}

impl From<&HeartRateSample> for HeartRateRecord {
    fn from(sample: &HeartRateSample) -> Self {
        HeartRateRecord {
            date_time: sample.timestamp.format(DATE_TIME_FMT).to_string(),
            value: HeartRateValue {
                bpm: sample.bpm,
                confidence: sample.confidence.as_u8(),
            },
        }
    }
}

/// Steps and calories share the `{dateTime, value: "<string>"}` shape
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteValueRecord {
    pub date_time: String,
    pub value: String,
}

pub fn steps_records(minutes: &[ActivityMinute]) -> Vec<MinuteValueRecord> {
    minutes
        .iter()
        .map(|m| MinuteValueRecord {
            date_time: m.timestamp.format(DATE_TIME_FMT).to_string(),
            value: m.steps.to_string(),
        })
        .collect()
}

pub fn calories_records(minutes: &[ActivityMinute]) -> Vec<MinuteValueRecord> {
    minutes
        .iter()
        .map(|m| MinuteValueRecord {
            date_time: m.timestamp.format(DATE_TIME_FMT).to_string(),
            value: m.calories.to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub count: u32,
    pub minutes: u32,
    pub thirty_day_avg_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct LevelsSummary {
    pub deep: StageSummary,
    pub light: StageSummary,
    pub rem: StageSummary,
    pub wake: StageSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLevels {
    pub summary: LevelsSummary,
    pub data: Vec<serde_json::Value>,
    pub short_data: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLogRecord {
    pub log_id: u64,
    pub date_of_sleep: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: u64,
    pub minutes_to_fall_asleep: u32,
    pub minutes_asleep: u32,
    pub minutes_awake: u32,
    pub minutes_after_wakeup: u32,
    pub time_in_bed: u32,
    pub efficiency: u8,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub info_code: u8,
    pub log_type: &'static str,
    pub levels: SleepLevels,
    pub main_sleep: bool,
}

/// Thirty-day stage averages (deep, light, rem, wake) shown alongside each log
const MAIN_THIRTY_DAY_AVG: [u32; 4] = [75, 200, 95, 40];
const NAP_THIRTY_DAY_AVG: [u32; 4] = [15, 35, 10, 5];

impl From<&SleepWindow> for SleepLogRecord {
    fn from(w: &SleepWindow) -> Self {
        let avg = if w.main_sleep {
            MAIN_THIRTY_DAY_AVG
        } else {
            NAP_THIRTY_DAY_AVG
        };
        let stage = |count: u32, minutes: u32, thirty_day_avg_minutes: u32| StageSummary {
            count,
            minutes,
            thirty_day_avg_minutes,
        };

        SleepLogRecord {
            log_id: w.log_id,
            date_of_sleep: w.date_of_sleep.format(DAY_FMT).to_string(),
            start_time: w.start.format(ISO_MS_FMT).to_string(),
            end_time: w.end.format(ISO_MS_FMT).to_string(),
            duration: w.duration_ms,
            minutes_to_fall_asleep: w.minutes_to_fall_asleep,
            minutes_asleep: w.minutes_asleep,
            minutes_awake: w.minutes_awake,
            minutes_after_wakeup: 0,
            time_in_bed: w.minutes_in_bed,
            efficiency: w.efficiency_pct,
            kind: "stages",
            info_code: 0,
            log_type: "auto_detected",
            levels: SleepLevels {
                summary: LevelsSummary {
                    deep: stage(w.stage_counts.deep, w.stages.deep, avg[0]),
                    light: stage(w.stage_counts.light, w.stages.light, avg[1]),
                    rem: stage(w.stage_counts.rem, w.stages.rem, avg[2]),
                    wake: stage(w.stage_counts.wake, w.stages.wake, avg[3]),
                },
                data: Vec::new(),
                short_data: Vec::new(),
            },
            main_sleep: w.main_sleep,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingHeartRateRecord {
    pub date_time: String,
    pub value: RestingHeartRateValue,
}

#[derive(Debug, Serialize)]
pub struct RestingHeartRateValue {
    pub date: String,
    pub value: f64,
    pub error: f64,
}

impl From<&DailyDerivedMetrics> for RestingHeartRateRecord {
    /// Stamped at midnight after the day closes
    fn from(m: &DailyDerivedMetrics) -> Self {
        let stamped = start_of_day(m.date) + Duration::days(1);
        RestingHeartRateRecord {
            date_time: stamped.format(DATE_TIME_FMT).to_string(),
            value: RestingHeartRateValue {
                date: m.date.format("%m/%d/%y").to_string(),
                value: m.resting_hr.value,
                error: m.resting_hr.error,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesRecord {
    pub date_time: String,
    pub value: ZonesValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesValue {
    pub values_in_zones: ValuesInZones,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ValuesInZones {
    pub in_default_zone_1: u32,
    pub in_default_zone_2: u32,
    pub in_default_zone_3: u32,
    pub below_default_zone_1: u32,
}

pub fn zones_record(date: NaiveDate, zones: &ZoneMinutes) -> ZonesRecord {
    ZonesRecord {
        date_time: start_of_day(date).format(DATE_TIME_FMT).to_string(),
        value: ZonesValue {
            values_in_zones: ValuesInZones {
                in_default_zone_1: zones.fat_burn,
                in_default_zone_2: zones.cardio,
                in_default_zone_3: zones.peak,
                below_default_zone_1: zones.out_of_range,
            },
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateZoneRecord {
    pub name: &'static str,
    pub min: u16,
    pub max: u16,
    pub minutes: u32,
    pub calories_out: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AzmZoneRecord {
    pub zone_name: &'static str,
    pub minutes: u32,
    pub minute_multiplier: u32,
    pub order: u8,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveZoneMinutes {
    pub total_minutes: u32,
    pub minutes_in_heart_rate_zones: Vec<AzmZoneRecord>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLevelRecord {
    pub name: &'static str,
    pub minutes: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLogRecord {
    pub log_id: u64,
    pub activity_name: &'static str,
    pub activity_type_id: u32,
    pub start_time: String,
    pub duration: u64,
    pub active_duration: u64,
    pub calories: u32,
    pub steps: u32,
    pub distance: f64,
    pub distance_unit: &'static str,
    pub average_heart_rate: u16,
    pub peak_heart_rate: u16,
    pub heart_rate_zones: Vec<HeartRateZoneRecord>,
    pub active_zone_minutes: ActiveZoneMinutes,
    pub activity_level: Vec<ActivityLevelRecord>,
    pub log_type: &'static str,
}

/// (zone name, AZM type, minute multiplier)
const AZM_ZONES: [(&str, &str, u32); 4] = [
    ("Out of Range", "OUT_OF_ZONE", 0),
    ("Fat Burn", "FAT_BURN", 1),
    ("Cardio", "CARDIO", 2),
    ("Peak", "PEAK", 2),
];

pub fn exercise_record(session: &ExerciseSession, max_hr: u16) -> ExerciseLogRecord {
    let minutes = session.hr_zone_minutes.as_array();
    let duration = session.duration_minutes.max(1);
    let duration_ms = u64::from(session.duration_minutes) * 60_000;

    let heart_rate_zones = zone_bands(max_hr)
        .into_iter()
        .zip(minutes)
        .map(|(band, m)| HeartRateZoneRecord {
            name: band.name,
            min: band.min,
            max: band.max,
            minutes: m,
            calories_out: session.calories * m / duration,
        })
        .collect();

    let minutes_in_heart_rate_zones = AZM_ZONES
        .iter()
        .zip(minutes)
        .enumerate()
        .map(|(order, (&(zone_name, kind, minute_multiplier), m))| AzmZoneRecord {
            zone_name,
            minutes: m,
            minute_multiplier,
            order: order as u8,
            kind,
        })
        .collect();

    let levels = session.activity_level_minutes;

    ExerciseLogRecord {
        log_id: session.log_id,
        activity_name: session.kind.display_name(),
        activity_type_id: session.kind.activity_type_id(),
        start_time: session.start.format(ISO_MS_FMT).to_string(),
        duration: duration_ms,
        active_duration: duration_ms,
        calories: session.calories,
        steps: session.steps,
        distance: session.distance_km.to_f64().unwrap_or(0.0),
        distance_unit: "Kilometer",
        average_heart_rate: session.avg_hr,
        peak_heart_rate: session.peak_hr,
        heart_rate_zones,
        active_zone_minutes: ActiveZoneMinutes {
            total_minutes: session.hr_zone_minutes.active_zone_minutes(),
            minutes_in_heart_rate_zones,
        },
        activity_level: vec![
            ActivityLevelRecord { name: "sedentary", minutes: levels.sedentary },
            ActivityLevelRecord { name: "lightly", minutes: levels.lightly },
            ActivityLevelRecord { name: "fairly", minutes: levels.fairly },
            ActivityLevelRecord { name: "very", minutes: levels.very },
        ],
        log_type: "auto_detected",
    }
}
