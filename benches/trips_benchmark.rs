use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use ridelink::models::{Ride, RideStatus};
use ridelink::services::trips::{build_trip_list, Trip, TripFilter, TripKind, TripRole, TripScope};
use ridelink::time_utils::parse_trip_datetime;
use std::hint::black_box;

/// A page of driver trips spread over a year, in both date formats, with
/// some recurring and some unreadable dates mixed in.
fn trip_page(count: usize) -> Vec<Trip> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(7, 30, 0)
        .unwrap();

    (0..count)
        .map(|i| {
            let when = start + Duration::hours(37 * i as i64);
            let trip_date = match i % 5 {
                0 => when.format("%d/%m/%Y %H:%M").to_string(),
                1 => when.format("%Y-%m-%dT%H:%M:%S").to_string(),
                2 => format!("{}Z", when.format("%Y-%m-%dT%H:%M:%S%.3f")),
                3 => "tomorrow morning".to_string(),
                _ => when.format("%d/%m/%Y %H:%M:%S").to_string(),
            };
            let mut ride = Ride {
                trip_date,
                status: if i % 3 == 0 {
                    RideStatus::Completed
                } else {
                    RideStatus::Available
                },
                ..Ride::placeholder(&format!("ride-{}", i))
            };
            if i % 11 == 0 {
                ride.recurrence_days = vec!["sunday".to_string(), "tuesday".to_string()];
            }
            Trip {
                role: TripRole::Driver,
                ride,
                request: None,
            }
        })
        .collect()
}

fn benchmark_trip_list(c: &mut Criterion) {
    let now = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let page = trip_page(40);
    let filtered = TripFilter {
        status: Some("available".to_string()),
        kind: TripKind::Driver,
        scope: TripScope::Upcoming,
    };

    let mut group = c.benchmark_group("trip_list");

    group.bench_function("partition_unfiltered", |b| {
        b.iter(|| build_trip_list(black_box(page.clone()), &TripFilter::default(), now))
    });

    group.bench_function("partition_filtered", |b| {
        b.iter(|| build_trip_list(black_box(page.clone()), &filtered, now))
    });

    group.finish();
}

fn benchmark_parse_dates(c: &mut Criterion) {
    let inputs = [
        "03/05/2024 09:00",
        "03/05/2024 09:00:30",
        "2024-05-03T09:00:00",
        "2024-05-03T09:00:00.000Z",
        "2024-05-03T12:00:00+03:00",
        "not a date",
    ];

    c.bench_function("parse_trip_datetime", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(parse_trip_datetime(black_box(input)));
            }
        })
    });
}

criterion_group!(benches, benchmark_trip_list, benchmark_parse_dates);
criterion_main!(benches);
