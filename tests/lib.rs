// Integration tests for the public API of nexter.
//
// These exercise enumerators the way a caller outside the crate would: over
// their own data structures, through the builder, and from several threads.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use nexter::*;

#[derive(Debug)]
enum Tree {
    Leaf(i32),
    Node(Box<Tree>, Box<Tree>),
}

impl Tree {
    fn walk(&self, visit: &mut impl FnMut(i32)) {
        match self {
            Tree::Leaf(x) => visit(*x),
            Tree::Node(left, right) => {
                left.walk(visit);
                right.walk(visit);
            }
        }
    }
}

fn tree() -> Tree {
    use Tree::*;
    Node(
        Box::new(Node(Box::new(Leaf(1)), Box::new(Leaf(2)))),
        Box::new(Node(Box::new(Leaf(3)), Box::new(Leaf(4)))),
    )
}

fn leaves(tree: Tree) -> Enumerator<i32> {
    Enumerator::builder(Arc::new(tree))
        .selector("each_leaf")
        .build(|tree: &Tree, y| {
            tree.walk(&mut |x| {
                y.yield_value(x);
            });
            Ok(())
        })
}

#[test]
fn recursive_traversal_is_pulled_one_leaf_at_a_time() {
    leaves(tree())
        .assert_next(1)
        .assert_peek(2)
        .assert_next(2)
        .assert_next(3)
        .assert_next(4)
        .assert_exhausted(());
}

#[test]
fn two_traversals_interleave() {
    let a = leaves(tree());
    let b = Enumerator::from_iter(|| ["w", "x", "y", "z"]);
    let mut pairs = Vec::new();
    while a.has_next() && b.has_next() {
        pairs.push((a.next().unwrap(), b.next().unwrap()));
    }
    assert_eq!(pairs, [(1, "w"), (2, "x"), (3, "y"), (4, "z")]);
}

#[test]
fn for_loop_over_a_reference() {
    let e = VecDeque::from(vec![3, 1, 2]).into_enumerator();
    let mut total = 0;
    for x in &e {
        total += x.unwrap();
    }
    assert_eq!(total, 6);
}

#[test]
fn shared_slice_is_random_access() {
    let shared: Arc<[&str]> = Arc::from(vec!["p", "q"]);
    shared
        .clone()
        .into_enumerator()
        .assert_next("p")
        .assert_next("q")
        .assert_exhausted(());
}

struct Squares(u64);

impl std::fmt::Debug for Squares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Squares({})", self.0)
    }
}

impl RandomAccess<u64> for Squares {
    fn len(&self) -> usize {
        self.0 as usize
    }

    fn get(&self, index: usize) -> Option<u64> {
        let i = index as u64;
        (i < self.0).then_some(i * i)
    }
}

#[test]
fn custom_random_access_source() {
    let e = Enumerator::over(Arc::new(Squares(4)));
    assert_eq!(e.size(), Size::Finite(4));
    assert_eq!(e.to_string(), "#<Enumerator: Squares(4):each>");
    let cons: Vec<Vec<u64>> = e
        .each_cons(2)
        .unwrap()
        .iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(cons, [vec![0, 1], vec![1, 4], vec![4, 9]]);
}

#[test]
fn derived_enumerators_nest() {
    let e = leaves(tree());
    let nested = e.each_slice(2).unwrap().with_index(1);
    assert_eq!(
        nested.to_string(),
        "#<Enumerator: #<Enumerator: #<Enumerator: Node(Node(Leaf(1), Leaf(2)), Node(Leaf(3), Leaf(4))):each_leaf>:each_slice(2)>:with_index(1)>"
    );
    nested
        .assert_next((vec![1, 2], 1))
        .assert_next((vec![3, 4], 2))
        .assert_exhausted(());
}

#[test]
fn wrapped_errors_keep_their_source() {
    let e: Enumerator<u8> = Enumerator::from_fn(|_: &mut Yielder<_>| {
        let parsed: Result<u8, _> = "300".parse::<u8>();
        parsed.map_err(Failure::from_error)?;
        Ok(())
    });
    let err = e.next().unwrap_err();
    let failure = err.failure().unwrap();
    assert_eq!(failure.kind(), "ParseIntError");
    assert!(std::error::Error::source(failure).is_some());
    assert_eq!(err.to_string(), failure.to_string());
}

#[test]
fn enumerator_is_shared_across_threads() {
    let e = Arc::new(Enumerator::from_iter(|| 0..100u32));
    let workers: Vec<_> = (0..3)
        .map(|_| {
            let e = e.clone();
            thread::spawn(move || e.iter().map(Result::unwrap).count())
        })
        .collect();
    let seen: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(seen, 100);
}

#[test]
fn configuration_from_a_lookup() {
    let config = Config::from_lookup(|key| match key {
        ENV_LIGHTWEIGHT => Some("false".into()),
        ENV_MAX_WORKERS => Some("3".into()),
        _ => None,
    });
    assert!(!config.lightweight);
    assert_eq!(config.pool.max_workers, 3);

    let pool = Arc::new(WorkerPool::new(config.pool.clone()));
    let e: Enumerator<char> = Enumerator::builder(Arc::new(vec!['a', 'b']))
        .lightweight(config.lightweight)
        .pool(pool.clone())
        .build_indexed();
    e.assert_next('a');
    assert_eq!(pool.live_workers(), 1);
}
