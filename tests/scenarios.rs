//! End-to-end scenarios exercising declaration, join evaluation, and the tick
//! loop together.

use latticeflow::lattice::{MapEntry, MapUnion, SetUnion};
use latticeflow::{DeclarationError, Dataflow, LatticeValue};

fn install_trace_subscriber() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[test]
fn identity_join_forwards_tuples() {
    install_trace_subscriber();
    let df = Dataflow::new_instance("node-a");
    let names = df.declare_lset::<String>("names", false).unwrap();
    let echoed = df.declare_lset::<String>("echoed", false).unwrap();
    df.join1(&names).name("echo").forward().into(&echoed);

    // Seeding before the first tick must go through `add_next`: `add`'s
    // immediate buffer is only drained between joins inside `tick()`, so a
    // bare `add` here would never become visible to `echo`'s first scan.
    df.add_next(&names, "alice".to_string());
    df.tick();

    assert_eq!(echoed.scan(), vec!["alice".to_string()]);
    assert_eq!(df.tick_count(), 1);
}

#[test]
fn map_projection_builds_totals() {
    let df = Dataflow::new_instance("node-a");
    let messages = df.declare_lset::<(String, String)>("messages", false).unwrap();
    let totals = df
        .declare_lmap::<String, SetUnion<String>>("totals", false)
        .unwrap();

    df.join1(&messages)
        .name("totals")
        .map_flat(|(room, user)| {
            let mut entry = MapUnion::<String, SetUnion<String>>::new();
            entry.direct_add(MapEntry::new(room.clone(), SetUnion::singleton(user.clone())));
            Some(entry)
        })
        .into(&totals);

    df.add_next(&messages, ("lobby".to_string(), "alice".to_string()));
    df.add_next(&messages, ("lobby".to_string(), "bob".to_string()));
    df.add_next(&messages, ("annex".to_string(), "carol".to_string()));
    df.tick();

    let snapshot = totals.value_snapshot();
    let lobby = snapshot.at(&"lobby".to_string()).unwrap();
    assert!(lobby.contains(&"alice".to_string()));
    assert!(lobby.contains(&"bob".to_string()));
    assert_eq!(snapshot.size(), 2);
}

#[test]
fn self_join_computes_transitive_closure() {
    let df = Dataflow::new_instance("node-a");
    let edges = df
        .declare_lset::<(String, String)>("edges", false)
        .unwrap();
    let reach = df
        .declare_lset::<(String, String)>("reach", false)
        .unwrap();

    df.join1(&edges).name("seed").forward().into(&reach);
    df.join2(&reach, &edges)
        .name("extend")
        .map(|r: &(String, String), e: &(String, String)| {
            if r.1 == e.0 {
                Some((r.0.clone(), e.1.clone()))
            } else {
                None
            }
        })
        .into(&reach);

    df.add_next(&edges, ("a".to_string(), "b".to_string()));
    df.add_next(&edges, ("b".to_string(), "c".to_string()));
    df.tick();
    assert_eq!(reach.size(), 3, "a-b, b-c, a-c");

    df.add_next(&edges, ("c".to_string(), "d".to_string()));
    df.tick();
    assert_eq!(reach.size(), 6, "full closure of a-b-c-d");
    assert!(reach.scan().contains(&("a".to_string(), "d".to_string())));
}

#[test]
fn async_join_defers_to_next_tick() {
    let df = Dataflow::new_instance("node-a");
    let r = df.declare_lset::<String>("r", false).unwrap();
    let s = df.declare_lset::<String>("s", false).unwrap();
    let t = df.declare_lset::<String>("t", false).unwrap();

    df.join1(&r).name("r-to-s").forward().into_async(&s);
    df.join1(&s).name("s-to-t").forward().into(&t);

    df.add_next(&r, "x".to_string());
    df.tick();
    assert!(t.is_empty(), "s-to-t must not see this tick's own deferred write");

    df.tick();
    assert_eq!(t.scan(), vec!["x".to_string()]);
}

#[test]
fn scratch_relation_resets_every_tick() {
    let df = Dataflow::new_instance("node-a");
    let alarm = df.declare_lbool("alarm", true).unwrap();

    // Simulates an externally-driven write landing mid-tick, outside the
    // join/change-buffer machinery (e.g. a channel relation fed by a
    // transport callback).
    alarm.direct_add(true);
    assert!(!alarm.is_empty());

    df.tick();
    assert!(alarm.is_empty(), "scratch relations reset to bottom at tick start");
}

#[test]
fn max_lattice_keeps_the_largest_value() {
    let df = Dataflow::new_instance("node-a");
    let score = df.declare_lmax("score", false).unwrap();

    df.add_next(&score, 5);
    df.add_next(&score, 12);
    df.add_next(&score, 7);
    df.tick();

    assert_eq!(score.value_snapshot().into_reveal(), 12);
}

#[test]
fn duplicate_relation_name_is_rejected() {
    let df = Dataflow::new_instance("node-a");
    df.declare_lbool("flag", false).unwrap();
    let err = df.declare_lbool("flag", false).unwrap_err();
    assert_eq!(err, DeclarationError::DuplicateRelation { name: "flag".to_string() });
}

#[test]
fn describe_relations_is_heterogeneous() {
    let df = Dataflow::new_instance("node-a");
    df.declare_lbool("alarm", true).unwrap();
    let names = df.declare_lset::<String>("names", false).unwrap();
    df.add_next(&names, "alice".to_string());
    df.tick();

    let summaries = df.describe_relations();
    assert_eq!(summaries.len(), 2);
    let names_summary = summaries.iter().find(|s| s.name == "names").unwrap();
    assert!(!names_summary.is_scratch);
    assert_eq!(names_summary.size, 1);
    let alarm_summary = summaries.iter().find(|s| s.name == "alarm").unwrap();
    assert!(alarm_summary.is_scratch);
}

#[test]
fn tick_before_hook_feeds_a_channel_relation() {
    let df = Dataflow::new_instance("node-a");
    let inbox = df.declare_channel::<SetUnion<String>>("inbox").unwrap();
    assert!(inbox.is_channel());

    // Simulates an embedder's transport delivering one inbound message per
    // tick, exactly at the seam spec.md §5 names for it.
    let mut delivered = false;
    let inbox_for_hook = inbox.clone();
    df.set_tick_before_hook(move |_df| {
        if !delivered {
            inbox_for_hook.direct_add("hello".to_string());
            delivered = true;
        }
    });

    df.tick();
    assert_eq!(inbox.scan(), vec!["hello".to_string()]);

    // A channel relation is also a scratch relation: it resets before the
    // next tick's hook runs again, so the delivered message does not linger.
    df.tick();
    assert!(inbox.is_empty());
}

#[test]
fn unknown_relation_lookup_is_rejected() {
    let df = Dataflow::new_instance("node-a");
    let err = df.relation::<latticeflow::BoolOr>("missing").unwrap_err();
    assert_eq!(err, DeclarationError::UnknownRelation { name: "missing".to_string() });
}
