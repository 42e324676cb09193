use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::path::Path;

use crate::models::PricePoint;
use crate::Result;

/// Load a price history from a JSON file
///
/// Expects an array of `{ "timestamp": "<RFC3339>", "price": <f64> }`.
/// Points are validated, sorted by time and deduplicated (last value wins
/// for a repeated timestamp).
pub fn load_prices(path: impl AsRef<Path>) -> Result<Vec<PricePoint>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_prices(&json)
}

/// Parse a JSON price array (see `load_prices`)
pub fn parse_prices(json: &str) -> Result<Vec<PricePoint>> {
    let points: Vec<PricePoint> = serde_json::from_str(json)?;

    for point in &points {
        validate_point(point)?;
    }

    Ok(sort_and_dedupe(points))
}

fn validate_point(point: &PricePoint) -> Result<()> {
    if !(point.price > 0.0 && point.price.is_finite()) {
        return Err(format!(
            "Invalid price {} at {}",
            point.price,
            point.timestamp.to_rfc3339()
        )
        .into());
    }
    Ok(())
}

fn sort_and_dedupe(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    // Stable sort keeps file order among equal timestamps
    points.sort_by_key(|p| p.timestamp);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => deduped.push(point),
        }
    }
    deduped
}

/// Keep points whose UTC date lies within `[start, end]` (both inclusive)
pub fn filter_range(
    points: &[PricePoint],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<PricePoint> {
    points
        .iter()
        .filter(|p| {
            let day = p.timestamp.date_naive();
            start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
        })
        .copied()
        .collect()
}

/// Thin a time-ordered series to one point per `every`
///
/// A point is kept when at least `every` has passed since the last kept point,
/// so a 5-minute feed sampled every 30 minutes yields one point per half hour.
pub fn sample_every(points: &[PricePoint], every: Duration) -> Vec<PricePoint> {
    let mut sampled = Vec::new();
    let mut last_kept: Option<DateTime<Utc>> = None;

    for point in points {
        let due = match last_kept {
            None => true,
            Some(t) => point.timestamp - t >= every,
        };
        if due {
            sampled.push(*point);
            last_kept = Some(point.timestamp);
        }
    }

    sampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_sorts_and_dedupes() {
        let json = r#"[
            {"timestamp": "2025-01-02T01:00:00Z", "price": 101.0},
            {"timestamp": "2025-01-02T00:00:00Z", "price": 100.0},
            {"timestamp": "2025-01-02T01:00:00Z", "price": 102.0}
        ]"#;

        let points = parse_prices(json).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].price, 100.0);
        assert_eq!(points[1].price, 102.0);
        assert!(points[0].timestamp < points[1].timestamp);
    }

    #[test]
    fn test_parse_rejects_bad_price() {
        let json = r#"[{"timestamp": "2025-01-02T00:00:00Z", "price": -5.0}]"#;

        let result = parse_prices(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid price"));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(parse_prices("{not json").is_err());
        assert!(parse_prices(r#"[{"price": 1.0}]"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_prices("/nonexistent/prices.json");
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_filter_range_is_inclusive() {
        let points = vec![
            PricePoint::new(at(1, 23, 30), 1.0),
            PricePoint::new(at(2, 0, 0), 2.0),
            PricePoint::new(at(3, 23, 59), 3.0),
            PricePoint::new(at(4, 0, 0), 4.0),
        ];

        let start = NaiveDate::from_ymd_opt(2025, 1, 2);
        let end = NaiveDate::from_ymd_opt(2025, 1, 3);
        let filtered = filter_range(&points, start, end);

        let prices: Vec<f64> = filtered.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![2.0, 3.0]);

        // Open ends keep everything
        assert_eq!(filter_range(&points, None, None).len(), 4);
    }

    #[test]
    fn test_sample_every_thins_feed() {
        // 5-minute feed for two hours
        let points: Vec<PricePoint> = (0..24)
            .map(|i| PricePoint::new(at(6, 0, 0) + Duration::minutes(5 * i), i as f64 + 1.0))
            .collect();

        let sampled = sample_every(&points, Duration::minutes(30));

        assert_eq!(sampled.len(), 4);
        assert_eq!(sampled[1].timestamp, at(6, 0, 30));
        assert_eq!(sampled[3].timestamp, at(6, 1, 30));
    }

    #[test]
    fn test_sample_every_tolerates_irregular_gaps() {
        let points = vec![
            PricePoint::new(at(6, 0, 0), 1.0),
            PricePoint::new(at(6, 0, 20), 2.0),
            PricePoint::new(at(6, 0, 35), 3.0),
            PricePoint::new(at(6, 0, 50), 4.0),
            PricePoint::new(at(6, 2, 0), 5.0),
        ];

        let sampled = sample_every(&points, Duration::minutes(30));
        let prices: Vec<f64> = sampled.iter().map(|p| p.price).collect();

        assert_eq!(prices, vec![1.0, 3.0, 5.0]);
    }
}
