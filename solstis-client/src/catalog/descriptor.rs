//! Command descriptors and status-code tables
//!
//! Every command's reply carries a `status` field whose shape and meaning
//! are specific to that command. Each descriptor records the shape and an
//! explicit code → outcome table, so decoding never relies on a shared rule.

use solstis_core::{SolstisError, SolstisResult};
use solstis_session::Envelope;
use solstis_session::envelope::first_scalar;
use serde_json::Value;

/// How the `status` field is encoded in a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusShape {
    /// `"status": 0`
    Scalar,
    /// `"status": [0]`
    Array,
    /// `"status": "ok"`, translated to a code through a text table
    Text(&'static [(&'static str, i64)]),
}

/// Meaning of one status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(&'static str),
}

/// Immutable description of one command
#[derive(Debug)]
pub struct CommandDescriptor {
    pub op: &'static str,
    pub reply_op: &'static str,
    pub shape: StatusShape,
    pub outcomes: &'static [(i64, Outcome)],
    /// Outcome of any code missing from `outcomes`
    pub otherwise: Outcome,
}

/// Code reported when a text status is not in the descriptor's text table
pub const UNKNOWN_TEXT_STATUS: i64 = -1;

const UNKNOWN_STATUS: Outcome = Outcome::Failure("unknown status");

impl CommandDescriptor {
    /// Outcome the table assigns to `code`
    pub fn outcome(&self, code: i64) -> Outcome {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, outcome)| *outcome)
            .unwrap_or(self.otherwise)
    }

    /// Read the raw status code of a reply according to this descriptor's shape
    pub fn status_code(&self, reply: &Envelope) -> SolstisResult<i64> {
        let raw = reply.require("status")?;
        let scalar = match (self.shape, raw) {
            (StatusShape::Scalar, Value::Array(_)) => None,
            (StatusShape::Scalar, value) => Some(value),
            (StatusShape::Array, Value::Array(_)) => first_scalar(raw),
            (StatusShape::Array, _) => None,
            (StatusShape::Text(table), value) => {
                let text = first_scalar(value).and_then(Value::as_str);
                return match text {
                    Some(text) => Ok(table
                        .iter()
                        .find(|(t, _)| *t == text)
                        .map(|(_, code)| *code)
                        .unwrap_or(UNKNOWN_TEXT_STATUS)),
                    None => Err(self.shape_error(raw)),
                };
            }
        };
        scalar
            .and_then(Value::as_i64)
            .ok_or_else(|| self.shape_error(raw))
    }

    /// Decode a reply's status into its code, or the specific failure
    pub fn decode(&self, reply: &Envelope) -> SolstisResult<i64> {
        let code = self.status_code(reply)?;
        match self.outcome(code) {
            Outcome::Success => Ok(code),
            Outcome::Failure(reason) => {
                log::debug!("{} reported status {}: {}", self.op, code, reason);
                Err(SolstisError::DeviceStatus {
                    op: self.op,
                    code,
                    reason,
                })
            }
        }
    }

    fn shape_error(&self, raw: &Value) -> SolstisError {
        SolstisError::InvalidData(format!(
            "'{}' status has unexpected shape (expected {:?}): {}",
            self.reply_op, self.shape, raw
        ))
    }
}

use Outcome::{Failure, Success};

pub const START_LINK: CommandDescriptor = CommandDescriptor {
    op: "start_link",
    reply_op: "start_link_reply",
    shape: StatusShape::Text(&[("ok", 0), ("failed", 1)]),
    outcomes: &[(0, Success), (1, Failure("link could not be formed"))],
    otherwise: Failure("could not determine link status"),
};

pub const SET_WAVE_M: CommandDescriptor = CommandDescriptor {
    op: "set_wave_m",
    reply_op: "set_wave_m_reply",
    shape: StatusShape::Scalar,
    outcomes: &[
        (0, Success),
        (1, Failure("no wavelength meter found")),
        (2, Failure("wavelength out of range")),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const SET_WAVE_M_REPORT: CommandDescriptor = CommandDescriptor {
    op: "set_wave_m",
    reply_op: "set_wave_m_f_r",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("tuning failed"))],
    otherwise: UNKNOWN_STATUS,
};

pub const POLL_WAVE_M: CommandDescriptor = CommandDescriptor {
    op: "poll_wave_m",
    reply_op: "poll_wave_m_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("no wavelength meter found")),
        (2, Success),
        (3, Success),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const STOP_WAVE_M: CommandDescriptor = CommandDescriptor {
    op: "stop_wave_m",
    reply_op: "stop_wave_m_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("no wavelength meter found"))],
    otherwise: UNKNOWN_STATUS,
};

pub const LOCK_WAVE_M: CommandDescriptor = CommandDescriptor {
    op: "lock_wave_m",
    reply_op: "lock_wave_m_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("no wavelength meter found"))],
    otherwise: UNKNOWN_STATUS,
};

pub const SET_WAVE_TOLERANCE_M: CommandDescriptor = CommandDescriptor {
    op: "set_wave_tolerance_m",
    reply_op: "set_wave_tolerance_m_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("no wavelength meter found")),
        (2, Failure("tolerance out of range")),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const MOVE_WAVE_T: CommandDescriptor = CommandDescriptor {
    op: "move_wave_t",
    reply_op: "move_wave_t_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("command failed, is the wavelength meter configured?")),
        (2, Failure("wavelength out of range")),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const MOVE_WAVE_T_REPORT: CommandDescriptor = CommandDescriptor {
    op: "move_wave_t",
    reply_op: "move_wave_t_f_r",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("tuning failed"))],
    otherwise: UNKNOWN_STATUS,
};

pub const POLL_MOVE_WAVE_T: CommandDescriptor = CommandDescriptor {
    op: "poll_move_wave_t",
    reply_op: "poll_move_wave_t_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Success),
        (2, Failure("tuning failed, is the wavelength meter configured?")),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const STOP_MOVE_WAVE_T: CommandDescriptor = CommandDescriptor {
    op: "stop_move_wave_t",
    reply_op: "stop_move_wave_t_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success)],
    otherwise: UNKNOWN_STATUS,
};

pub const SCAN_STITCH_INITIALISE: CommandDescriptor = CommandDescriptor {
    op: "scan_stitch_initialise",
    reply_op: "scan_stitch_initialise_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("start wavelength out of range")),
        (2, Failure("stop wavelength out of range")),
        (3, Failure("scan range too wide")),
    ],
    otherwise: Failure("TeraScan not available"),
};

pub const SCAN_STITCH_OP: CommandDescriptor = CommandDescriptor {
    op: "scan_stitch_op",
    reply_op: "scan_stitch_op_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("operation failed, reason unknown"))],
    otherwise: Failure("TeraScan not available"),
};

pub const SCAN_STITCH_STATUS: CommandDescriptor = CommandDescriptor {
    op: "scan_stitch_status",
    reply_op: "scan_stitch_status_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Success)],
    otherwise: Failure("TeraScan not available"),
};

pub const TERASCAN_OUTPUT: CommandDescriptor = CommandDescriptor {
    op: "terascan_output",
    reply_op: "terascan_output_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("automatic output configuration failed")),
        (2, Failure("delay out of range")),
        (3, Failure("update step out of range")),
    ],
    otherwise: Failure("TeraScan not available"),
};

pub const TERASCAN_CONTINUE: CommandDescriptor = CommandDescriptor {
    op: "terascan_continue",
    reply_op: "terascan_continue_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("operation failed, TeraScan was not paused"))],
    otherwise: Failure("TeraScan not available"),
};

pub const FAST_SCAN_START: CommandDescriptor = CommandDescriptor {
    op: "fast_scan_start",
    reply_op: "fast_scan_start_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("scan width too large for current tuning position")),
        (2, Failure("reference cavity not fitted")),
        (3, Failure("ERC not fitted")),
        (4, Failure("invalid scan type")),
    ],
    otherwise: Failure("scan time too long"),
};

pub const FAST_SCAN_POLL: CommandDescriptor = CommandDescriptor {
    op: "fast_scan_poll",
    reply_op: "fast_scan_poll_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Success),
        (2, Failure("reference cavity not fitted")),
        (3, Failure("ERC not fitted")),
        (4, Failure("invalid scan type")),
    ],
    otherwise: UNKNOWN_STATUS,
};

pub const FAST_SCAN_STOP: CommandDescriptor = CommandDescriptor {
    op: "fast_scan_stop",
    reply_op: "fast_scan_stop_reply",
    shape: StatusShape::Array,
    outcomes: &[
        (0, Success),
        (1, Failure("operation failed, reason unknown")),
        (2, Failure("reference cavity not fitted")),
        (3, Failure("ERC not fitted")),
        (4, Failure("invalid scan type")),
    ],
    otherwise: UNKNOWN_STATUS,
};

const TUNE_OUTCOMES: &[(i64, Outcome)] = &[
    (0, Success),
    (1, Failure("setting out of range")),
    (2, Failure("tuning failed")),
];

pub const TUNE_ETALON: CommandDescriptor = CommandDescriptor {
    op: "tune_etalon",
    reply_op: "tune_etalon_reply",
    shape: StatusShape::Array,
    outcomes: TUNE_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const TUNE_RESONATOR: CommandDescriptor = CommandDescriptor {
    op: "tune_resonator",
    reply_op: "tune_resonator_reply",
    shape: StatusShape::Array,
    outcomes: TUNE_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const FINE_TUNE_RESONATOR: CommandDescriptor = CommandDescriptor {
    op: "fine_tune_resonator",
    reply_op: "fine_tune_resonator_reply",
    shape: StatusShape::Array,
    outcomes: TUNE_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

const LOCK_OUTCOMES: &[(i64, Outcome)] = &[(0, Success), (1, Failure("lock operation failed"))];

pub const ETALON_LOCK: CommandDescriptor = CommandDescriptor {
    op: "etalon_lock",
    reply_op: "etalon_lock_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const CAVITY_LOCK: CommandDescriptor = CommandDescriptor {
    op: "cavity_lock",
    reply_op: "cavity_lock_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const ECD_LOCK: CommandDescriptor = CommandDescriptor {
    op: "ecd_lock",
    reply_op: "ecd_lock_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

const LOCK_STATUS_OUTCOMES: &[(i64, Outcome)] =
    &[(0, Success), (1, Failure("could not read lock status"))];

pub const ETALON_LOCK_STATUS: CommandDescriptor = CommandDescriptor {
    op: "etalon_lock_status",
    reply_op: "etalon_lock_status_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_STATUS_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const CAVITY_LOCK_STATUS: CommandDescriptor = CommandDescriptor {
    op: "cavity_lock_status",
    reply_op: "cavity_lock_status_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_STATUS_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const ECD_LOCK_STATUS: CommandDescriptor = CommandDescriptor {
    op: "ecd_lock_status",
    reply_op: "ecd_lock_status_reply",
    shape: StatusShape::Array,
    outcomes: LOCK_STATUS_OUTCOMES,
    otherwise: UNKNOWN_STATUS,
};

pub const GET_STATUS: CommandDescriptor = CommandDescriptor {
    op: "get_status",
    reply_op: "get_status_reply",
    shape: StatusShape::Array,
    outcomes: &[(0, Success), (1, Failure("operation failed, reason unknown"))],
    otherwise: UNKNOWN_STATUS,
};

/// Every request descriptor, in catalog order
///
/// Final-report descriptors (`*_f_r`) share their command's op and are
/// listed separately in [`FINAL_REPORTS`].
pub const CATALOG: &[&CommandDescriptor] = &[
    &START_LINK,
    &SET_WAVE_M,
    &POLL_WAVE_M,
    &STOP_WAVE_M,
    &LOCK_WAVE_M,
    &SET_WAVE_TOLERANCE_M,
    &MOVE_WAVE_T,
    &POLL_MOVE_WAVE_T,
    &STOP_MOVE_WAVE_T,
    &SCAN_STITCH_INITIALISE,
    &SCAN_STITCH_OP,
    &SCAN_STITCH_STATUS,
    &TERASCAN_OUTPUT,
    &TERASCAN_CONTINUE,
    &FAST_SCAN_START,
    &FAST_SCAN_POLL,
    &FAST_SCAN_STOP,
    &TUNE_ETALON,
    &TUNE_RESONATOR,
    &FINE_TUNE_RESONATOR,
    &ETALON_LOCK,
    &CAVITY_LOCK,
    &ECD_LOCK,
    &ETALON_LOCK_STATUS,
    &CAVITY_LOCK_STATUS,
    &ECD_LOCK_STATUS,
    &GET_STATUS,
];

/// Descriptors of the unsolicited final reports sent after `report: finished`
pub const FINAL_REPORTS: &[&CommandDescriptor] = &[&SET_WAVE_M_REPORT, &MOVE_WAVE_T_REPORT];

/// Look up a request descriptor by op
pub fn descriptor(op: &str) -> Option<&'static CommandDescriptor> {
    CATALOG.iter().copied().find(|d| d.op == op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn reply(op: &str, status: Value) -> Envelope {
        Envelope::decode(json!({"message": {"transmission_id": [1], "op": op,
            "parameters": {"status": status}}}))
        .unwrap()
    }

    #[test]
    fn test_catalog_is_consistent() {
        let mut ops = HashSet::new();
        for d in CATALOG {
            assert!(ops.insert(d.op), "duplicate op {}", d.op);
            assert_eq!(d.reply_op, format!("{}_reply", d.op));
            assert_eq!(d.outcome(0), Outcome::Success, "{}", d.op);
        }
        assert!(descriptor("get_status").is_some());
        assert!(descriptor("warp_drive").is_none());
    }

    #[test]
    fn test_set_wave_m_table() {
        assert_eq!(SET_WAVE_M.decode(&reply("set_wave_m_reply", json!(0))).unwrap(), 0);
        let err = SET_WAVE_M.decode(&reply("set_wave_m_reply", json!(1))).unwrap_err();
        assert!(err.to_string().contains("no wavelength meter"));
        let err = SET_WAVE_M.decode(&reply("set_wave_m_reply", json!(2))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(err.status_code(), Some(2));
    }

    #[test]
    fn test_shape_is_enforced_per_command() {
        assert!(matches!(
            SET_WAVE_M.decode(&reply("set_wave_m_reply", json!([0]))),
            Err(SolstisError::InvalidData(_))
        ));
        assert!(matches!(
            MOVE_WAVE_T.decode(&reply("move_wave_t_reply", json!(0))),
            Err(SolstisError::InvalidData(_))
        ));
        assert_eq!(MOVE_WAVE_T.decode(&reply("move_wave_t_reply", json!([0]))).unwrap(), 0);
    }

    #[test]
    fn test_otherwise_rules() {
        assert_eq!(
            SCAN_STITCH_INITIALISE.outcome(3),
            Failure("scan range too wide")
        );
        assert_eq!(SCAN_STITCH_INITIALISE.outcome(4), Failure("TeraScan not available"));
        assert_eq!(SCAN_STITCH_OP.outcome(2), Failure("TeraScan not available"));
        assert_eq!(TERASCAN_OUTPUT.outcome(3), Failure("update step out of range"));
        assert_eq!(TERASCAN_OUTPUT.outcome(9), Failure("TeraScan not available"));
        assert_eq!(FAST_SCAN_START.outcome(3), Failure("ERC not fitted"));
        assert_eq!(FAST_SCAN_START.outcome(4), Failure("invalid scan type"));
        assert_eq!(FAST_SCAN_START.outcome(5), Failure("scan time too long"));
        assert_eq!(GET_STATUS.outcome(1), Failure("operation failed, reason unknown"));
    }

    #[test]
    fn test_text_status() {
        assert_eq!(START_LINK.decode(&reply("start_link_reply", json!("ok"))).unwrap(), 0);
        let err = START_LINK.decode(&reply("start_link_reply", json!("failed"))).unwrap_err();
        assert!(err.to_string().contains("link could not be formed"));
        let err = START_LINK.decode(&reply("start_link_reply", json!("maybe"))).unwrap_err();
        assert_eq!(err.status_code(), Some(UNKNOWN_TEXT_STATUS));
    }
}
