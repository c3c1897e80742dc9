//! End-to-end checks on synthetic sweeps with a known after-spike current model.

use clap::Parser;

use asc_glm::app::pipeline;
use asc_glm::cli::{Cli, Command};
use asc_glm::data::{SynthConfig, generate_sweeps};
use asc_glm::domain::{FitConfig, FitMode, SeedParams, SweepFile};
use asc_glm::fit::fit_asc_pairwise;
use asc_glm::io::{read_sweep_file, write_fit_csv, write_fit_json, write_sweep_file, write_traces_csv};
use asc_glm::report::sweep_traces;

const CANDIDATE_RATES: [f64; 5] = [5.0, 20.0, 60.0, 200.0, 600.0];

fn synth() -> SynthConfig {
    SynthConfig {
        n_sweeps: 2,
        samples: 6000,
        filter_len: 2000,
        ..SynthConfig::default()
    }
}

fn sweeps() -> SweepFile {
    generate_sweeps(&synth()).unwrap()
}

fn true_seeds(cfg: &SynthConfig) -> SeedParams {
    SeedParams {
        capacitance: cfg.capacitance,
        time_constant: cfg.resistance * cfg.capacitance,
        resting_potential: cfg.resting_potential,
    }
}

fn fit_config(cfg: &SynthConfig, seeds: SeedParams, mode: FitMode) -> FitConfig {
    let mut config = FitConfig::new(seeds, cfg.dt, 30);
    config.filter_len = cfg.filter_len;
    config.mode = mode;
    config
}

fn rel(a: f64, b: f64) -> f64 {
    ((a - b) / b).abs()
}

#[test]
fn generating_pair_wins_and_parameters_are_recovered() {
    let cfg = synth();
    let file = sweeps();
    let config = fit_config(&cfg, true_seeds(&cfg), FitMode::Asc);

    let fit = fit_asc_pairwise(&CANDIDATE_RATES, &file.sweeps, &config).unwrap();

    assert_eq!(fit.candidates.len(), 10);
    // (20, 200) is the fifth pair in lexicographic order.
    assert_eq!(fit.best_index, 5);
    assert!(rel(fit.best_rates[0], 20.0) < 1e-9);
    assert!(rel(fit.best_rates[1], 200.0) < 1e-9);

    assert_eq!(fit.amplitudes.len(), 2);
    for (i, amps) in fit.amplitudes.iter().enumerate() {
        assert!(rel(amps[0], cfg.asc_amplitudes[0]) < 1e-6, "sweep {i}: {amps:?}");
        assert!(rel(amps[1], cfg.asc_amplitudes[1]) < 1e-6, "sweep {i}: {amps:?}");
        assert!(rel(fit.resistances[i], cfg.resistance) < 1e-6);
    }
    assert_eq!(fit.capacitances, vec![None, None]);
    assert_eq!(fit.reversal_potentials, vec![None, None]);

    let best_mean = fit.candidates[fit.best_index].mean_log_likelihood;
    assert!(fit
        .candidates
        .iter()
        .filter(|c| c.index != fit.best_index)
        .all(|c| c.mean_log_likelihood < best_mean));
}

#[test]
fn free_capacitance_mode_recovers_capacitance_and_reversal_potential() {
    let cfg = synth();
    let file = sweeps();
    let seeds = SeedParams {
        capacitance: 80e-12,
        time_constant: 12e-3,
        resting_potential: -0.06,
    };
    let config = fit_config(&cfg, seeds, FitMode::AscRElC);

    let fit = fit_asc_pairwise(&CANDIDATE_RATES, &file.sweeps, &config).unwrap();

    assert!(rel(fit.best_rates[0], 20.0) < 1e-9);
    assert!(rel(fit.best_rates[1], 200.0) < 1e-9);
    for i in 0..2 {
        let c = fit.capacitances[i].unwrap();
        let el = fit.reversal_potentials[i].unwrap();
        assert!(rel(c, cfg.capacitance) < 1e-6, "sweep {i}: C={c}");
        assert!((el - cfg.resting_potential).abs() < 1e-6, "sweep {i}: El={el}");
    }
}

#[test]
fn output_parts_come_in_storage_order() {
    let cfg = synth();
    let file = sweeps();

    let fit = fit_asc_pairwise(&CANDIDATE_RATES, &file.sweeps, &fit_config(&cfg, true_seeds(&cfg), FitMode::Asc)).unwrap();
    let (rates, amplitudes, resistances, capacitances, reversal_potentials, log_likelihoods) = fit.into_parts();
    assert!(rel(rates[0], 20.0) < 1e-9);
    assert!(rel(rates[1], 200.0) < 1e-9);
    assert_eq!(amplitudes.len(), 2);
    assert!(rel(amplitudes[0][0], cfg.asc_amplitudes[0]) < 1e-6);
    assert!(rel(amplitudes[0][1], cfg.asc_amplitudes[1]) < 1e-6);
    assert!(resistances.iter().all(|&r| rel(r, cfg.resistance) < 1e-6));
    assert_eq!(capacitances, vec![None, None]);
    assert_eq!(reversal_potentials, vec![None, None]);
    assert_eq!(log_likelihoods.len(), 2);
    assert!(log_likelihoods.iter().all(|l| !l.is_nan()));

    let seeds = SeedParams {
        capacitance: 80e-12,
        ..true_seeds(&cfg)
    };
    let fit = fit_asc_pairwise(&CANDIDATE_RATES, &file.sweeps, &fit_config(&cfg, seeds, FitMode::AscRElC)).unwrap();
    let (_, _, _, capacitances, reversal_potentials, log_likelihoods) = fit.into_parts();
    assert!(capacitances.iter().all(|c| c.is_some_and(|c| rel(c, cfg.capacitance) < 1e-6)));
    assert!(reversal_potentials
        .iter()
        .all(|e| e.is_some_and(|e| (e - cfg.resting_potential).abs() < 1e-6)));
    assert_eq!(log_likelihoods.len(), 2);
}

#[test]
fn short_run_evaluates_only_the_first_pair() {
    let cfg = synth();
    let file = sweeps();
    let mut config = fit_config(&cfg, true_seeds(&cfg), FitMode::AscR);
    config.short_run = true;

    let fit = fit_asc_pairwise(&CANDIDATE_RATES, &file.sweeps, &config).unwrap();
    assert_eq!(fit.candidates.len(), 1);
    assert_eq!(fit.best_index, 0);
    assert!(rel(fit.best_rates[0], 5.0) < 1e-9);
    assert!(rel(fit.best_rates[1], 20.0) < 1e-9);
}

#[test]
fn cli_pipeline_reads_sweep_file_and_writes_exports() {
    let dir = std::env::temp_dir().join(format!("asglm_pipeline_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let sweeps_path = dir.join("sweeps.json");
    let json_path = dir.join("fit.json");
    let csv_path = dir.join("fit.csv");
    let traces_path = dir.join("traces.csv");

    let cfg = synth();
    write_sweep_file(&sweeps_path, &sweeps()).unwrap();
    assert_eq!(read_sweep_file(&sweeps_path).unwrap().dt, Some(cfg.dt));

    let cli = Cli::parse_from([
        "asglm".to_string(),
        "fit".to_string(),
        "--sweeps".to_string(),
        sweeps_path.display().to_string(),
        "--rates".to_string(),
        "5,20,60,200,600".to_string(),
        "--capacitance".to_string(),
        cfg.capacitance.to_string(),
        "--tau".to_string(),
        (cfg.resistance * cfg.capacitance).to_string(),
        format!("--resting-potential={}", cfg.resting_potential),
        "--npcut".to_string(),
        "30".to_string(),
        "--nkt".to_string(),
        cfg.filter_len.to_string(),
    ]);
    let Command::Fit(args) = cli.command else {
        panic!("expected fit subcommand");
    };

    let run = pipeline::run_fit(&args).unwrap();
    assert_eq!(run.config.dt, cfg.dt);
    assert!(rel(run.fit.best_rates[0], 20.0) < 1e-9);
    assert!(rel(run.fit.best_rates[1], 200.0) < 1e-9);

    write_fit_json(&json_path, &run.fit, &run.config, &args.rates).unwrap();
    write_fit_csv(&csv_path, &run.fit).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(doc["fit"]["best_index"], 5);
    assert_eq!(doc["candidate_rates"].as_array().unwrap().len(), 5);
    assert!(doc["tool"].as_str().unwrap().starts_with("asglm"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let traces = sweep_traces(&run.sweeps.sweeps, &run.fit, &run.config);
    assert_eq!(traces.len(), 2);
    let first_spike = run.sweeps.sweeps[0].spike_indices[0];
    let amps = run.fit.amplitudes[0];
    assert!(traces[0].post_spike_current[..first_spike].iter().all(|&v| v == 0.0));
    assert!(rel(traces[0].post_spike_current[first_spike], amps[0] + amps[1]) < 1e-12);
    assert_eq!(traces[0].decays[0].len(), cfg.filter_len);

    write_traces_csv(&traces_path, &traces, run.config.dt).unwrap();
    let text = std::fs::read_to_string(&traces_path).unwrap();
    assert_eq!(text.lines().count(), 1 + 2 * cfg.samples);

    std::fs::remove_dir_all(&dir).ok();
}
