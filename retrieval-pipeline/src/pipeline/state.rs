use state_machines::state_machine;

state_machine! {
    name: QueryMachine,
    state: QueryState,
    initial: Received,
    states: [Received, Filtered, Blocked, Embedded, Retrieved, Assembled, Generated, Done, Failed],
    events {
        filter { transition: { from: Received, to: Filtered } }
        block { transition: { from: Filtered, to: Blocked } }
        embed { transition: { from: Filtered, to: Embedded } }
        retrieve { transition: { from: Embedded, to: Retrieved } }
        assemble { transition: { from: Retrieved, to: Assembled } }
        generate { transition: { from: Assembled, to: Generated } }
        finish { transition: { from: Generated, to: Done } }
        abort {
            transition: { from: Received, to: Failed }
            transition: { from: Filtered, to: Failed }
            transition: { from: Embedded, to: Failed }
            transition: { from: Retrieved, to: Failed }
            transition: { from: Assembled, to: Failed }
            transition: { from: Generated, to: Failed }
        }
    }
}

pub fn ready() -> QueryMachine<(), Received> {
    QueryMachine::new(())
}
