use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use geocity::{
    CoordinateInput, Error, Geocoder, PlaceRecord, QueryCoordinate, QueryOptions, ResultSet,
};

fn diriamba() -> PlaceRecord {
    PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922)
        .alternate_names(["Diriamba", "Diriambo"])
        .country("NI", "Nicaragua")
        .population(35008)
        .timezone("America/Managua")
        .modified(NaiveDate::from_ymd_opt(2018, 8, 8).unwrap())
        .build()
}

fn corinto() -> PlaceRecord {
    PlaceRecord::builder(3620269, "Corinto", 12.4825, -87.17304)
        .country("NI", "Nicaragua")
        .population(19183)
        .timezone("America/Managua")
        .modified(NaiveDate::from_ymd_opt(2018, 8, 8).unwrap())
        .build()
}

/// Pseudo-random places spread over the globe, deterministic per seed.
fn random_places(n: usize, seed: u64) -> Vec<PlaceRecord> {
    let mut state = seed;
    let mut rng = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state as f64) / (u64::MAX as f64)
    };
    (0..n)
        .map(|i| {
            let (lat, lon) = (rng() * 180.0 - 90.0, rng() * 360.0 - 180.0);
            PlaceRecord::builder(i as u64, &format!("place-{}", i), lat, lon)
                .population((rng() * 1_000_000.0) as u64)
                .build()
        })
        .collect()
}

fn ids(results: &ResultSet) -> Vec<u64> {
    results.iter().map(|r| r.place.id).collect()
}

#[test]
fn exact_match_on_single_row_table() {
    let geocoder = geocity::build_index(vec![diriamba()]).unwrap();
    let results = geocity::query(&geocoder, [11.85812, -86.23922], 1, None).unwrap();

    assert_eq!(results.len(), 1);
    let record = &results.records()[0];
    assert_eq!(record.place.id, 3620170);
    assert_eq!(record.distance, 0.0);
    assert_eq!(record.coord_index, None);
    assert_eq!(record.rank, 0);
}

#[test]
fn batch_groups_follow_input_order() {
    let geocoder = geocity::build_index(vec![diriamba(), corinto()]).unwrap();
    let results = geocity::query(
        &geocoder,
        vec![[11.85812, -86.23922], [12.4825, -87.17304]],
        1,
        None,
    )
    .unwrap();

    assert!(results.is_batch());
    assert_eq!(ids(&results), vec![3620170, 3620269]);
    assert_eq!(
        results.iter().map(|r| r.coord_index).collect::<Vec<_>>(),
        vec![Some(0), Some(1)]
    );

    let reversed = geocity::query(
        &geocoder,
        vec![[12.4825, -87.17304], [11.85812, -86.23922]],
        1,
        None,
    )
    .unwrap();
    assert_eq!(ids(&reversed), vec![3620269, 3620170]);
}

#[test]
fn k_larger_than_table_is_clamped() {
    let geocoder = geocity::build_index(vec![diriamba()]).unwrap();
    let results = geocity::query(&geocoder, [0.0, 0.0], 2, None).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn zero_k_is_invalid_argument() {
    let geocoder = geocity::build_index(vec![diriamba()]).unwrap();
    let err = geocity::query(&geocoder, [11.85812, -86.23922], 0, None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(!err.is_input_error());
}

#[test]
fn three_flat_numbers_are_invalid_coordinates() {
    let geocoder = geocity::build_index(vec![diriamba()]).unwrap();
    let err = geocity::query(&geocoder, vec![11.85812, -86.23922, 5.0], 1, None).unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinate(_)));
    assert!(err.is_input_error());
}

#[test]
fn malformed_batch_returns_no_partial_results() {
    let geocoder = geocity::build_index(vec![diriamba(), corinto()]).unwrap();
    let input = CoordinateInput::from_json(r#"[[11.85, -86.23], [12.48, "west"]]"#).unwrap();
    let err = geocoder.query(&input, &QueryOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinate(_)));
}

#[test]
fn empty_table_cannot_be_indexed() {
    assert!(matches!(
        geocity::build_index(Vec::new()),
        Err(Error::Construction(_))
    ));
}

#[test]
fn one_pair_batch_resolves_as_single_coordinate() {
    let geocoder = geocity::build_index(vec![diriamba(), corinto()]).unwrap();
    let nested = geocity::query(&geocoder, vec![[12.4825, -87.17304]], 1, None).unwrap();
    let flat = geocity::query(&geocoder, [12.4825, -87.17304], 1, None).unwrap();

    assert!(!nested.is_batch());
    assert_eq!(nested, flat);
    assert_eq!(nested.records()[0].coord_index, None);
}

#[test]
fn single_results_sorted_by_distance() {
    let geocoder = Geocoder::new(random_places(3000, 7)).unwrap();
    let results = geocity::query(&geocoder, [48.85, 2.35], 25, None).unwrap();

    assert_eq!(results.len(), 25);
    assert!(results
        .records()
        .windows(2)
        .all(|w| w[0].distance <= w[1].distance));
    assert!(results.iter().enumerate().all(|(i, r)| r.rank == i));
}

#[test]
fn results_match_linear_scan() {
    let places = random_places(1500, 99);
    let geocoder = Geocoder::new(places.clone()).unwrap();
    let query = QueryCoordinate::new(-33.86, 151.2);

    let mut expected: Vec<(f64, usize)> = places
        .iter()
        .enumerate()
        .map(|(row, p)| (query.distance_to(&p.location()), row))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let results = geocity::query(&geocoder, query, 10, None).unwrap();
    let rows: Vec<usize> = results.iter().map(|r| r.row).collect();
    let expected_rows: Vec<usize> = expected.iter().take(10).map(|&(_, row)| row).collect();
    assert_eq!(rows, expected_rows);
}

#[test]
fn batch_tags_cover_every_coordinate() {
    let geocoder = Geocoder::new(random_places(500, 3)).unwrap();
    let coords: Vec<[f64; 2]> = (0..12)
        .map(|i| [i as f64 * 7.0 - 40.0, i as f64 * 25.0 - 150.0])
        .collect();
    let k = 4;
    let results = geocity::query(&geocoder, coords.clone(), k, None).unwrap();

    assert_eq!(results.len(), coords.len() * k);
    let tags: Vec<usize> = results.iter().map(|r| r.coord_index.unwrap()).collect();
    let expected: Vec<usize> = (0..coords.len())
        .flat_map(|i| std::iter::repeat(i).take(k))
        .collect();
    assert_eq!(tags, expected);
    assert_eq!(results.groups().count(), coords.len());
}

#[test]
fn queries_are_idempotent() {
    let geocoder = Geocoder::new(random_places(800, 11)).unwrap();
    let coords = vec![[10.0, 10.0], [-45.0, 170.0], [89.0, -179.0]];
    let first = geocity::query(&geocoder, coords.clone(), 5, Some(false)).unwrap();
    let second = geocity::query(&geocoder, coords, 5, Some(false)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn identical_coordinates_come_back_in_row_order() {
    let twin_a = PlaceRecord::builder(10, "Twin A", 5.0, 5.0).build();
    let twin_b = PlaceRecord::builder(20, "Twin B", 5.0, 5.0).build();
    let far = PlaceRecord::builder(30, "Far", -60.0, 100.0).build();
    let geocoder = Geocoder::new(vec![far, twin_b, twin_a]).unwrap();

    let results = geocity::query(&geocoder, [4.0, 4.0], 2, None).unwrap();
    assert_eq!(ids(&results), vec![20, 10]);
    assert_eq!(results.records()[0].distance, results.records()[1].distance);
}

#[test]
fn descending_population_within_groups() {
    let geocoder = Geocoder::new(random_places(2000, 5)).unwrap();
    let coords = vec![[0.0, 0.0], [30.0, -60.0], [-20.0, 120.0]];
    let results = geocity::query(&geocoder, coords, 6, Some(false)).unwrap();

    for group in results.groups() {
        assert_eq!(group.len(), 6);
        assert!(group
            .windows(2)
            .all(|w| w[0].place.population >= w[1].place.population));
        let mut ranks: Vec<usize> = group.iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..6).collect::<Vec<_>>());
    }
    let tags: Vec<_> = results.groups().map(|g| g[0].coord_index).collect();
    assert_eq!(tags, vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn ascending_population_picks_same_candidates() {
    let geocoder = Geocoder::new(random_places(2000, 5)).unwrap();
    let by_distance = geocity::query(&geocoder, [12.0, 34.0], 8, None).unwrap();
    let by_population = geocity::query(&geocoder, [12.0, 34.0], 8, Some(true)).unwrap();

    let mut a = ids(&by_distance);
    let mut b = ids(&by_population);
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
    assert!(by_population
        .records()
        .windows(2)
        .all(|w| w[0].place.population <= w[1].place.population));
}

#[test]
fn concurrent_queries_share_one_geocoder() {
    let geocoder = Arc::new(Geocoder::new(random_places(1000, 21)).unwrap());
    let expected = geocity::query(&geocoder, [40.0, -74.0], 3, None).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let geocoder = Arc::clone(&geocoder);
            thread::spawn(move || geocity::query(&geocoder, [40.0, -74.0], 3, None).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn csv_and_snapshot_files_load_the_same_table() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("geonames.csv");
    std::fs::write(
        &csv,
        "Geoname ID;Name;ASCII Name;Alternate Names;Country Code;Country name EN;Population;Timezone;Modification date;LABEL EN;Coordinates\n\
         3620170;Diriamba;Diriamba;Diriamba,Diriambo;NI;Nicaragua;35008;America/Managua;2018-08-08;Nicaragua;11.85812, -86.23922\n\
         3620269;Corinto;Corinto;Corinto;NI;Nicaragua;19183;America/Managua;2018-08-08;Nicaragua;12.4825, -87.17304\n",
    )
    .unwrap();

    let from_csv = Geocoder::open(&csv).unwrap();
    let snapshot = dir.path().join("places.bin");
    std::fs::write(&snapshot, from_csv.to_snapshot_bytes().unwrap()).unwrap();
    let from_snapshot = Geocoder::open(&snapshot).unwrap();

    assert_eq!(from_csv.records(), from_snapshot.records());
    assert_eq!(from_csv.records()[0], diriamba());
    assert!(matches!(
        Geocoder::open(dir.path().join("missing.bin")),
        Err(Error::Io(_))
    ));
}
