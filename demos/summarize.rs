//! Load an in-memory SessionData record and print its derived tables

use bpod_session::analysis::{
    event_occurrence_medians, event_occurrence_table, session_dead_time, state_duration_medians,
    state_duration_table,
};
use bpod_session::JsonRecordReader;

fn main() {
    let json = r#"{
        "SessionData": {
            "Info": { "SessionDate": "15-Jan-2024", "SessionStartTime_UTC": "14:00:00" },
            "nTrials": 2,
            "TrialStartTimestamp": [0.0, 12.0],
            "TrialEndTimestamp": [10.0, 20.0],
            "RawEvents": { "Trial": [
                { "States": { "WaitForPoke": [0.0, 2.0], "Reward": [2.0, 2.2] },
                  "Events": { "Port1In": 1.9, "Port1Out": 2.4 } },
                { "States": { "WaitForPoke": [[0.0, 1.0], [3.0, 5.0]], "Reward": [null, null] },
                  "Events": { "Port1In": [0.8, 4.9], "Port1Out": 1.1, "Tup": 5.0 } }
            ]}
        }
    }"#;

    let session = match JsonRecordReader
        .parse_str(json)
        .and_then(|raw| bpod_session::load(raw))
    {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    print!("{}", session.summary());

    let states = state_duration_table(&session);
    let events = event_occurrence_table(&session);
    println!("{:#?}", state_duration_medians(&states));
    println!("{:#?}", event_occurrence_medians(&events));
    println!("dead time: {:?}", session_dead_time(&session));
}
