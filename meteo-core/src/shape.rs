//! Turns normalized forecast responses into tool output.

use chrono::{DateTime, Utc};

use crate::{
    WeatherError,
    model::{CurrentConditions, CurrentValues, ForecastRecord, HourlySeries, Variable},
};

/// Number of steps in `[start, end)`.
pub fn step_count(series: &HourlySeries) -> usize {
    let interval = series.interval.num_milliseconds();
    let span = (series.end - series.start).num_milliseconds();
    if interval <= 0 || span <= 0 {
        return 0;
    }
    usize::try_from(span / interval + i64::from(span % interval != 0)).unwrap_or(0)
}

/// Timestamps of `[start, end)` stepped by `interval`, produced lazily.
pub fn timestamps(series: &HourlySeries) -> impl Iterator<Item = DateTime<Utc>> + '_ {
    let first = (series.interval > chrono::Duration::zero()).then_some(series.start);
    std::iter::successors(first, move |t| t.checked_add_signed(series.interval))
        .take_while(move |t| *t < series.end)
}

/// One record per timestamp, in chronological order.
///
/// If any value array disagrees in length with the time axis, the output is cut
/// to the shortest of them.
pub fn hourly_records(series: &HourlySeries) -> Vec<ForecastRecord> {
    let steps = step_count(series);

    let shortest = series.values.iter().map(|(_, v)| v.len()).min().unwrap_or(steps);
    let count = steps.min(shortest);

    if series.values.iter().any(|(_, v)| v.len() != steps) {
        tracing::warn!(
            "Hourly arrays disagree with the time axis ({} timestamps, lengths {:?}); \
             keeping {} rows",
            steps,
            series.values.iter().map(|(var, v)| (var.as_str(), v.len())).collect::<Vec<_>>(),
            count
        );
    }

    timestamps(series)
        .take(count)
        .enumerate()
        .map(|(i, date)| ForecastRecord {
            date,
            values: series.values.iter().map(|(var, v)| (*var, v[i])).collect(),
        })
        .collect()
}

pub fn current_conditions(current: &CurrentValues) -> Result<CurrentConditions, WeatherError> {
    let get = |variable: Variable| {
        current.get(variable).ok_or_else(|| {
            WeatherError::ContractViolation(format!("current variable '{variable}' missing"))
        })
    };

    Ok(CurrentConditions {
        temperature_2m: get(Variable::Temperature2m)?,
        relative_humidity_2m: get(Variable::RelativeHumidity2m)?,
        apparent_temperature: get(Variable::ApparentTemperature)?,
        precipitation: get(Variable::Precipitation)?,
        weather_code: get(Variable::WeatherCode)?,
        wind_speed_10m: get(Variable::WindSpeed10m)?,
        wind_direction_10m: get(Variable::WindDirection10m)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CURRENT_VARIABLES;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn series(hours: i64, values: Vec<(Variable, Vec<Option<f64>>)>) -> HourlySeries {
        HourlySeries {
            start: t0(),
            end: t0() + Duration::hours(hours),
            interval: Duration::hours(1),
            values,
        }
    }

    #[test]
    fn three_hours_three_records() {
        let s = series(
            3,
            vec![(Variable::Temperature2m, vec![Some(10.0), Some(11.0), Some(12.0)])],
        );

        let records = hourly_records(&s);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, t0());
        assert_eq!(records[1].date, t0() + Duration::hours(1));
        assert_eq!(records[2].date, t0() + Duration::hours(2));
        assert_eq!(records[0].get(Variable::Temperature2m), Some(10.0));
        assert_eq!(records[1].get(Variable::Temperature2m), Some(11.0));
        assert_eq!(records[2].get(Variable::Temperature2m), Some(12.0));
    }

    #[test]
    fn end_is_exclusive() {
        let s = series(2, vec![]);
        let times: Vec<_> = timestamps(&s).collect();
        assert_eq!(times, vec![t0(), t0() + Duration::hours(1)]);
        assert_eq!(step_count(&s), 2);
    }

    #[test]
    fn diverging_lengths_truncate_to_shortest() {
        let s = series(
            4,
            vec![
                (Variable::Temperature2m, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
                (Variable::Precipitation, vec![Some(0.0), Some(0.2)]),
            ],
        );

        let records = hourly_records(&s);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get(Variable::Precipitation), Some(0.2));
        assert_eq!(records[1].get(Variable::Temperature2m), Some(2.0));
    }

    #[test]
    fn values_longer_than_time_axis_are_cut() {
        let s = series(1, vec![(Variable::Temperature2m, vec![Some(1.0), Some(2.0)])]);
        assert_eq!(hourly_records(&s).len(), 1);
    }

    #[test]
    fn records_keep_request_order_and_nulls() {
        let s = series(
            1,
            vec![
                (Variable::Temperature2m, vec![Some(9.0)]),
                (Variable::RelativeHumidity2m, vec![None]),
            ],
        );

        let records = hourly_records(&s);
        let order: Vec<Variable> = records[0].values.iter().map(|(v, _)| *v).collect();
        assert_eq!(order, vec![Variable::Temperature2m, Variable::RelativeHumidity2m]);
        assert_eq!(records[0].get(Variable::RelativeHumidity2m), None);
    }

    #[test]
    fn zero_interval_yields_nothing() {
        let mut s = series(3, vec![]);
        s.interval = Duration::zero();
        assert_eq!(timestamps(&s).count(), 0);
        assert_eq!(step_count(&s), 0);
    }

    #[test]
    fn current_conditions_map_by_name() {
        // Reverse order on purpose: lookup must not depend on position.
        let values: Vec<(Variable, f64)> = CURRENT_VARIABLES
            .iter()
            .rev()
            .enumerate()
            .map(|(i, v)| (*v, i as f64))
            .collect();
        let current = CurrentValues { time: t0(), interval: Duration::minutes(15), values };

        let out = current_conditions(&current).unwrap();
        assert_eq!(out.wind_direction_10m, 0.0);
        assert_eq!(out.wind_speed_10m, 1.0);
        assert_eq!(out.weather_code, 2.0);
        assert_eq!(out.precipitation, 3.0);
        assert_eq!(out.apparent_temperature, 4.0);
        assert_eq!(out.relative_humidity_2m, 5.0);
        assert_eq!(out.temperature_2m, 6.0);
    }

    #[test]
    fn current_conditions_missing_variable_errors() {
        let current = CurrentValues {
            time: t0(),
            interval: Duration::minutes(15),
            values: vec![(Variable::Temperature2m, 1.0)],
        };
        let err = current_conditions(&current).unwrap_err();
        assert!(err.to_string().contains("relative_humidity_2m"));
    }

    #[test]
    fn wide_time_axis_yields_only_as_many_records_as_values() {
        // Ten years of hourly steps, three values.
        let s = series(24 * 365 * 10, vec![(Variable::Temperature2m, vec![Some(1.0); 3])]);

        let records = hourly_records(&s);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].date, t0() + Duration::hours(2));
    }

    #[test]
    fn partial_last_step_is_counted() {
        let mut s = series(2, vec![]);
        s.end += Duration::minutes(30);
        assert_eq!(step_count(&s), 3);
        assert_eq!(timestamps(&s).count(), 3);
    }
}
