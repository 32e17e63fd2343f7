use crossbeam_channel::unbounded;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::Duration;
use sudoku_miner_rs::config::{ParticipantConfig, TransferConfig};
use sudoku_miner_rs::miner::solver::CancelToken;
use sudoku_miner_rs::network::{Message, NetEvent};
use sudoku_miner_rs::puzzle::{hash_grid, seed_from_hash};
use sudoku_miner_rs::*;

fn client(name: &str, genesis: &Arc<Block>, net: &Arc<FakeNet>) -> Client {
    Client::new(
        name,
        SigningKey::generate(&mut OsRng),
        genesis.clone(),
        ChainParams::default(),
        net.clone(),
    )
}

#[test]
fn genesis_child_is_mined_announced_and_verified_by_a_peer() {
    let genesis = Arc::new(Block::genesis());
    let net = Arc::new(FakeNet::new());

    let mut bob = client("bob", &genesis, &net);
    let (bob_tx, bob_rx) = unbounded();
    net.register(bob.address().clone(), bob_tx);

    let (inbox, results) = unbounded();
    let mut miner = MiningEngine::new(
        client("minnie", &genesis, &net),
        Arc::new(BacktrackSolver::new()),
        inbox,
        None,
    )
    .unwrap();

    miner.handle(Message::StartMining).unwrap();
    let expected = Puzzle::generate(0, 3, 0.5);
    assert_eq!(expected.blanks(), 40);
    assert_eq!(
        miner.candidate().and_then(|c| c.puzzle.clone()),
        Some(expected.serialize())
    );

    let outcome = results.recv_timeout(Duration::from_secs(10)).unwrap();
    miner.handle(outcome).unwrap();
    let b1 = miner.client().last_block();
    assert_eq!(b1.chain_length, 1);

    // Bob checks the announced proof with nothing but the codec, then accepts it.
    let announced = match bob_rx.recv_timeout(Duration::from_secs(1)).unwrap() {
        Message::Event(NetEvent::ProofFound(block)) => block,
        other => panic!("expected a proof, got {:?}", other),
    };
    assert_eq!(announced.hash(), b1.hash());
    assert!(verify_encoded(
        &expected.serialize(),
        announced.commitment.as_deref().unwrap(),
        announced.moves.as_deref().unwrap(),
    ));
    let accepted = bob.receive_block(announced).unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(bob.last_block().hash(), b1.hash());

    // The next puzzle is seeded by the new tip's hash.
    let seed = seed_from_hash(&b1.hash());
    assert_ne!(seed, 0);
    let emptiness = DifficultyPolicy::default().emptiness_for(b1.solve_duration_ms);
    assert_eq!(
        miner.candidate().and_then(|c| c.puzzle.clone()),
        Some(Puzzle::generate(seed, 3, emptiness).serialize())
    );
}

#[test]
fn precomputed_proof_verifies_without_a_solver() {
    let puzzle = Puzzle::generate(4242, 3, 0.75).serialize();
    let solution = BacktrackSolver::new()
        .solve(&puzzle, &CancelToken::detached())
        .unwrap();
    let commitment = hash_grid(&solution.solved.digits());
    let encoded = solution.moves.encode().unwrap();

    assert!(verify_encoded(&puzzle, &commitment, &encoded));
    assert!(verify_solution(&puzzle, &commitment, &solution.moves));
    assert!(!verify_encoded(&puzzle, &hash_grid("123"), &encoded));
}

#[tokio::test(flavor = "multi_thread")]
async fn simulation_produces_an_auditable_chain() {
    let config = Config {
        base: 2,
        duration_ms: 600,
        report_interval_secs: 0,
        participants: vec![
            ParticipantConfig {
                name: "alice".into(),
                role: Role::Client,
                ms_per_blank: 0,
                join_after_ms: 0,
            },
            ParticipantConfig {
                name: "minnie".into(),
                role: Role::Miner,
                ms_per_blank: 3,
                join_after_ms: 0,
            },
            ParticipantConfig {
                name: "mickey".into(),
                role: Role::Miner,
                ms_per_blank: 4,
                join_after_ms: 150,
            },
        ],
        transfers: vec![TransferConfig {
            from: "alice".into(),
            to: "minnie".into(),
            amount: 10,
            fee: 1,
            at_ms: 50,
        }],
        ..Config::default()
    };

    let report = simulation::run(&config).await.unwrap();
    assert!(!report.interrupted);
    assert_eq!(report.participants.len(), 3);

    let longest = report.longest().unwrap();
    assert!(longest.chain_length >= 1);

    let path = std::env::temp_dir().join(format!("sudoku-chain-{}.json", std::process::id()));
    report.dump_longest(&path).unwrap();
    let dump = ChainDump::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(dump.audit().unwrap() as u64, longest.chain_length);
}
