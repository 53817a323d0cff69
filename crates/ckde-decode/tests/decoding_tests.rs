//! End-to-end decoding scenarios

mod common;

use ckde_core::Error;
use ckde_decode::{BaselineRate, Decoder, Observation, PoissonLikelihood, StimulusOccupancy};
use ckde_mixture::MixtureConfig;
use ckde_space::{EuclideanSpace, Space};
use common::{arms, assert_relative_eq, place_cell, track, track_occupancy};
use std::sync::Arc;

#[test]
fn test_flat_intensity_gives_uniform_posterior() {
    let stimulus = arms(&["A", "B", "C"]);
    let mut occ = StimulusOccupancy::new(Arc::clone(&stimulus), 1.0).unwrap();
    occ.add_samples(&[[0.0], [1.0], [2.0]]).unwrap();

    let mut decoder = Decoder::new(occ);
    for id in ["channel1", "channel2"] {
        let mut lik = PoissonLikelihood::stimulus_only(Arc::clone(&stimulus), BaselineRate::Empirical).unwrap();
        lik.add_events(&[[0.0], [1.0], [2.0]]).unwrap();
        decoder.add_channel(id, lik).unwrap();
    }

    let posterior = decoder.decode([("channel1", 3u64), ("channel2", 3u64)]).unwrap();
    for &p in posterior.probabilities() {
        assert_relative_eq!(p, 1.0 / 3.0, epsilon = 1e-15);
    }
    assert_eq!(posterior.channels(), &["channel1".to_string(), "channel2".to_string()]);
}

#[test]
fn test_place_cells_recover_position() {
    let stimulus = track();
    let occ = track_occupancy(&stimulus, 5000, 0.02, 1);
    let mut builder = Decoder::builder(occ).bin_duration(0.5).precompute(true);
    let centers = [10.0, 30.0, 50.0, 70.0, 90.0];
    for (k, &c) in centers.iter().enumerate() {
        builder = builder.channel(format!("cell{k}"), place_cell(&stimulus, c, 400, k as u64 + 10));
    }
    let decoder = builder.build().unwrap();

    // strong firing from the cell at 70, silence elsewhere
    let observations: Vec<(String, u64)> = (0..centers.len())
        .map(|k| (format!("cell{k}"), if k == 3 { 12 } else { 0 }))
        .collect();
    let posterior = decoder.decode(observations).unwrap();
    let map = posterior.map_point(decoder.grid()).unwrap();
    assert!((map[0] - 70.0).abs() <= 6.0, "decoded {}", map[0]);

    let total: f64 = posterior.probabilities().iter().sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-12);

    let density = posterior.density(decoder.grid()).unwrap();
    let integral: f64 = density
        .iter()
        .zip(decoder.grid().cell_weights())
        .map(|(d, w)| d * w)
        .sum();
    assert_relative_eq!(integral, 1.0, epsilon = 1e-12);
}

#[test]
fn test_covariate_events_sharpen_decoding() {
    let stimulus = arms(&["left", "right"]);
    let mut occ = StimulusOccupancy::new(Arc::clone(&stimulus), 1.0).unwrap();
    occ.add_samples(&[[0.0], [1.0]]).unwrap();

    // spike amplitude distinguishes two units recorded on one electrode
    let amplitude: Space = EuclideanSpace::gaussian("amplitude", 5.0).unwrap().into();
    let event_space = stimulus.space().merge_into_product(&[amplitude]).unwrap();
    let mut lik = PoissonLikelihood::with_config(
        Arc::clone(&stimulus),
        event_space,
        BaselineRate::Empirical,
        MixtureConfig::default(),
    )
    .unwrap();
    let mut events = Vec::new();
    for _ in 0..20 {
        events.push([0.0, 100.0]);
        events.push([1.0, 40.0]);
    }
    lik.add_events(&events).unwrap();

    let decoder = Decoder::builder(occ).channel("tetrode", lik).build().unwrap();

    // counts alone cannot tell the arms apart
    let by_count = decoder.decode([("tetrode", 2u64)]).unwrap();
    assert_relative_eq!(by_count.probabilities()[0], 0.5, epsilon = 1e-12);

    let by_amplitude = decoder
        .decode([("tetrode", Observation::Events(vec![vec![98.0], vec![103.0]]))])
        .unwrap();
    assert!(by_amplitude.probabilities()[0] > 0.99);
    assert_eq!(by_amplitude.map_index(), 0);
}

#[test]
fn test_unknown_channel_fails_before_work() {
    let stimulus = arms(&["A", "B"]);
    let mut occ = StimulusOccupancy::new(Arc::clone(&stimulus), 1.0).unwrap();
    occ.add_samples(&[[0.0], [1.0]]).unwrap();
    let decoder = Decoder::new(occ);
    match decoder.decode([("ghost", 1u64)]) {
        Err(Error::UnknownChannel(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected unknown channel, got {other:?}"),
    }
}

#[test]
fn test_stale_channels_are_evaluated_on_the_fly() {
    let stimulus = track();
    let occ = track_occupancy(&stimulus, 2000, 0.02, 3);
    let mut decoder = Decoder::builder(occ)
        .channel("cell", place_cell(&stimulus, 40.0, 200, 4))
        .precompute(true)
        .build()
        .unwrap();
    let before = decoder.decode([("cell", 5u64)]).unwrap();

    decoder.channel_mut("cell").unwrap().add_event(&[40.0]).unwrap();
    assert!(decoder.channel("cell").unwrap().is_stale(decoder.occupancy()));
    let lazy = decoder.decode([("cell", 5u64)]).unwrap();
    decoder.refresh().unwrap();
    let cached = decoder.decode([("cell", 5u64)]).unwrap();
    assert_eq!(lazy, cached);
    assert_ne!(before, cached);
}

#[test]
fn test_serde_round_trip_decodes_identically() {
    let stimulus = track();
    let occ = track_occupancy(&stimulus, 1000, 0.02, 5);
    let decoder = Decoder::builder(occ)
        .channel("a", place_cell(&stimulus, 20.0, 100, 6))
        .channel("b", place_cell(&stimulus, 80.0, 100, 7))
        .build()
        .unwrap();

    let json = serde_json::to_string(&decoder).unwrap();
    let back: Decoder = serde_json::from_str(&json).unwrap();
    let input = [("a", 2u64), ("b", 1u64)];
    assert_eq!(decoder.decode(input).unwrap(), back.decode(input).unwrap());
}
