use std::collections::HashSet;

use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::C51Error;
use crate::replay_buffer::{PrioritizedReplayBuffer, ReplayBuffer, Transition, TransitionBatch, UniformReplayBuffer};

fn transition(i: usize) -> Transition {
    Transition {
        state: array![i as f32, 0.0],
        action: i % 2,
        reward: i as f32,
        next_state: array![(i + 1) as f32, 0.0],
        done: i % 3 == 0,
    }
}

#[test]
fn test_replay_buffer_add_and_sample() {
    let mut buffer = UniformReplayBuffer::new(10);
    let mut rng = StdRng::seed_from_u64(0);
    buffer.push(transition(4));
    assert_eq!(buffer.len(), 1);

    let batch = buffer.sample(1, &mut rng).unwrap();
    assert_eq!(batch.states.row(0).to_vec(), vec![4.0, 0.0]);
    assert_eq!(batch.next_states.row(0).to_vec(), vec![5.0, 0.0]);
    assert_eq!(batch.actions, vec![0]);
    assert_eq!(batch.rewards[0], 4.0);
    assert_eq!(batch.terminals[0], 0.0);
    assert!(batch.weights.is_none());
}

#[test]
fn test_replay_buffer_capacity() {
    let mut buffer = UniformReplayBuffer::new(3);
    for i in 0..5 {
        buffer.push(transition(i));
    }

    assert_eq!(buffer.len(), 3);
    assert!(buffer.is_full());
    let rewards: Vec<f32> = buffer.iter().map(|t| t.reward).collect();
    assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_sampling_without_replacement() {
    let mut buffer = UniformReplayBuffer::new(20);
    for i in 0..20 {
        buffer.push(transition(i));
    }
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..10 {
        let batch = buffer.sample(20, &mut rng).unwrap();
        let distinct: HashSet<usize> = batch.indices.iter().copied().collect();
        assert_eq!(distinct.len(), 20);
        let rewards: HashSet<i64> = batch.rewards.iter().map(|&r| r as i64).collect();
        assert_eq!(rewards.len(), 20);
    }
}

#[test]
fn test_sample_size_errors() {
    let mut buffer = UniformReplayBuffer::new(10);
    let mut rng = StdRng::seed_from_u64(2);
    assert!(matches!(buffer.sample(1, &mut rng), Err(C51Error::EmptyBuffer(_))));

    buffer.push(transition(1));
    assert!(matches!(buffer.sample(2, &mut rng), Err(C51Error::EmptyBuffer(_))));
    assert!(matches!(buffer.sample(0, &mut rng), Err(C51Error::Configuration { .. })));
}

#[test]
fn test_clear() {
    let mut buffer = UniformReplayBuffer::new(4);
    for i in 0..4 {
        buffer.push(transition(i));
    }
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), 4);
}

#[test]
fn test_batch_stacking_rejects_ragged_states() {
    let a = transition(0);
    let mut b = transition(1);
    b.next_state = array![1.0, 2.0, 3.0];
    assert!(matches!(
        TransitionBatch::from_transitions(&[&a, &b], vec![0, 1]),
        Err(C51Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        TransitionBatch::from_transitions(&[], vec![]),
        Err(C51Error::EmptyBuffer(_))
    ));
}

#[test]
fn test_terminal_flags() {
    let t = transition(3);
    let batch = TransitionBatch::from_transitions(&[&t], vec![0]).unwrap();
    assert_eq!(batch.terminals[0], 1.0);
}

#[test]
fn test_prioritized_new_transitions_get_max_priority() {
    let mut buffer = PrioritizedReplayBuffer::new(10, 0.6, 0.4);
    buffer.push(transition(0));
    buffer.update_priorities(&[0], &[5.0]);
    buffer.push(transition(1));

    let priorities: Vec<f32> = buffer.priorities().copied().collect();
    assert_eq!(priorities, vec![5.0, 5.0]);
    assert_eq!(buffer.max_priority(), 5.0);
}

#[test]
fn test_prioritized_sampling_prefers_high_priority() {
    let mut buffer = PrioritizedReplayBuffer::new(10, 1.0, 0.4);
    for i in 0..10 {
        buffer.push_with_priority(transition(i), if i == 7 { 100.0 } else { 0.1 });
    }
    let mut rng = StdRng::seed_from_u64(3);

    let mut hits = 0;
    for _ in 0..50 {
        let batch = buffer.sample(10, &mut rng).unwrap();
        hits += batch.indices.iter().filter(|&&i| i == 7).count();
    }
    // index 7 holds roughly 98% of the probability mass
    assert!(hits > 400, "high-priority transition drawn {} times out of 500", hits);
}

#[test]
fn test_prioritized_weights_are_normalized() {
    let mut buffer = PrioritizedReplayBuffer::new(8, 0.6, 0.4);
    for i in 0..8 {
        buffer.push_with_priority(transition(i), (i + 1) as f32);
    }
    let mut rng = StdRng::seed_from_u64(4);
    let batch = buffer.sample(6, &mut rng).unwrap();
    let weights = batch.weights.unwrap();

    assert_eq!(weights.len(), 6);
    assert!(weights.iter().all(|&w| w > 0.0 && w <= 1.0));
    assert!(weights.iter().any(|&w| (w - 1.0).abs() < 1e-6));
}

#[test]
fn test_prioritized_update_ignores_bad_values() {
    let mut buffer = PrioritizedReplayBuffer::new(4, 0.6, 0.4);
    buffer.push(transition(0));
    buffer.push(transition(1));
    buffer.update_priorities(&[0, 1, 9], &[f32::NAN, 2.0, 3.0]);

    let priorities: Vec<f32> = buffer.priorities().copied().collect();
    assert_eq!(priorities, vec![1.0, 2.0]);
}

#[test]
fn test_prioritized_eviction() {
    let mut buffer = PrioritizedReplayBuffer::new(2, 0.6, 0.4);
    for i in 0..3 {
        buffer.push_with_priority(transition(i), i as f32);
    }
    assert_eq!(buffer.len(), 2);
    let priorities: Vec<f32> = buffer.priorities().copied().collect();
    assert_eq!(priorities, vec![1.0, 2.0]);
}

#[test]
fn test_prioritized_clear_resets_max_priority() {
    let mut buffer = PrioritizedReplayBuffer::new(4, 0.6, 0.4);
    buffer.push(transition(0));
    buffer.update_priorities(&[0], &[7.5]);
    assert_eq!(buffer.max_priority(), 7.5);

    buffer.clear();
    assert_eq!(buffer.max_priority(), 1.0);
    buffer.push(transition(1));
    let priorities: Vec<f32> = buffer.priorities().copied().collect();
    assert_eq!(priorities, vec![1.0]);
}
