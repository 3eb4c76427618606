use super::SeqSpace;

/// the window holds exactly `window_size + 1` consecutive IDs from the tail
#[test]
fn window_membership() {
  for max_id in [2, 16, 256] {
    let space = SeqSpace::new(max_id);
    for tail in 0..max_id {
      let accepted: Vec<u16> = (0..max_id).filter(|&id| space.in_window(tail, id)).collect();
      assert_eq!(accepted.len(), space.window_size() as usize + 1);
      for step in 0..=space.window_size() {
        assert!(space.in_window(tail, space.add(tail, step)));
      }
    }
  }
}

#[test]
fn wrap_around() {
  let space = SeqSpace::new(256);
  assert_eq!(space.next(255), 0);
  assert_eq!(space.add(250, 10), 4);
  assert_eq!(space.distance(250, 4), 10);
  assert_eq!(space.distance(4, 250), 246);
  assert_eq!(space.distance(7, 7), 0);
  // behind the tail after a wrap
  assert!(!space.in_window(10, 200));
  assert!(space.in_window(200, 10));
}

#[test]
fn bounds() {
  let space = SeqSpace::new(128);
  assert!(space.contains(127));
  assert!(!space.contains(128));
}

#[test]
#[should_panic]
fn not_power_of_two() {
  SeqSpace::new(200);
}
