//! Runs lifecycle plans against a small register model to check the
//! behaviour the generated units are expected to have at runtime.
use std::collections::HashMap;
use std::fs;
use vulsim_frontend::Workspace;
use vulsim_ir::{
    BackendConf, Combine, CommitAction, Id, LifecyclePlan, StorageField,
    ast_to_ir,
};

/// State of one combine instance. Values are plain integers.
#[derive(Default)]
struct Model {
    current: HashMap<Id, i64>,
    /// Winning proposal and its priority.
    pending: HashMap<Id, (i64, u8)>,
    stalled: bool,
    plan: LifecyclePlan,
}

impl Model {
    fn new(combine: &Combine) -> Self {
        let mut current = HashMap::new();
        for field in &combine.storage {
            let (name, default) = match field {
                StorageField::Plain { name, default, .. }
                | StorageField::NextBuffered { name, default, .. } => {
                    (*name, default.clone().unwrap_or_else(|| "0".into()))
                }
                StorageField::TickReset { name, default, .. } => {
                    (*name, default.clone())
                }
            };
            current.insert(name, default.parse().unwrap());
        }
        Model {
            current,
            plan: LifecyclePlan::for_combine(combine),
            ..Default::default()
        }
    }

    fn get(&self, name: &str) -> i64 {
        self.current[&Id::new(name)]
    }

    fn set(&mut self, name: &str, value: i64) {
        self.current.insert(Id::new(name), value);
    }

    /// Runtime arbitration: highest priority wins, an equal priority
    /// replaces the earlier proposal.
    fn setnext(&mut self, name: &str, value: i64, priority: u8) {
        let slot = self.pending.entry(Id::new(name)).or_insert((value, priority));
        if priority >= slot.1 {
            *slot = (value, priority);
        }
    }

    fn stall(&mut self) {
        self.stalled = true;
    }

    /// `all_current_applytick` without any user logic.
    fn applytick(&mut self) {
        for action in self.plan.commit.clone() {
            match action {
                CommitAction::ApplyBuffered(name) => {
                    if let Some((value, _)) = self.pending.remove(&name) {
                        self.current.insert(name, value);
                    }
                }
                CommitAction::ResetTick { name, default, .. } => {
                    self.current.insert(name, default.parse().unwrap());
                }
                CommitAction::ClearStall => self.stalled = false,
            }
        }
    }
}

fn compile(descriptor: &str) -> Combine {
    let dir = tempfile::tempdir().unwrap();
    for sub in ["bundle", "combine", "cpp"] {
        fs::create_dir(dir.path().join(sub)).unwrap();
    }
    fs::write(dir.path().join("combine/unit.xml"), descriptor).unwrap();
    let ws = Workspace::construct(dir.path()).unwrap();
    let mut ctx = ast_to_ir(ws, BackendConf::default()).unwrap();
    ctx.combines.remove(0)
}

#[test]
fn storagenext_proposals_are_invisible_until_applytick() {
    let combine = compile(
        r#"<combine><name>Unit</name>
            <storagenext><name>pc</name><type>uint64</type><value>4</value></storagenext>
        </combine>"#,
    );
    let mut m = Model::new(&combine);
    m.setnext("pc", 10, 1);
    m.setnext("pc", 20, 2);
    m.setnext("pc", 30, 1);
    // Proposals are invisible during the tick phase.
    assert_eq!(m.get("pc"), 4);
    m.applytick();
    assert_eq!(m.get("pc"), 20);
    // No proposal, no change.
    m.applytick();
    assert_eq!(m.get("pc"), 20);
}

#[test]
fn storagetick_resets_at_applytick() {
    let combine = compile(
        r#"<combine><name>Unit</name>
            <storagetick><name>fire</name><type>int32</type><value>0</value></storagetick>
        </combine>"#,
    );
    let mut m = Model::new(&combine);
    m.set("fire", 7);
    assert_eq!(m.get("fire"), 7);
    m.applytick();
    assert_eq!(m.get("fire"), 0);
}

#[test]
fn stall_is_visible_until_applytick() {
    let combine = compile(
        r#"<combine><name>Unit</name><stallable/></combine>"#,
    );
    let mut m = Model::new(&combine);
    assert!(!m.stalled);
    m.stall();
    assert!(m.stalled);
    m.applytick();
    assert!(!m.stalled);
}

#[test]
fn plain_storage_is_untouched_by_applytick() {
    let combine = compile(
        r#"<combine><name>Unit</name>
            <storage><name>count</name><type>uint32</type><value>3</value></storage>
            <storagetick><name>flag</name><type>bool</type></storagetick>
        </combine>"#,
    );
    let mut m = Model::new(&combine);
    m.set("count", 9);
    m.set("flag", 1);
    m.applytick();
    assert_eq!(m.get("count"), 9);
    assert_eq!(m.get("flag"), 0);
}
