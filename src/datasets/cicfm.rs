//! CIC flow-meter DDoS captures (CIC-DDoS2019 CSV exports).
//!
//! 88 columns: identifiers, addresses and timestamps are skipped, the
//! `Label` column uses a 13-entry attack vocabulary and every other column
//! is stored as `float`.

use crate::codec::{ColumnType, LabelSet};
use crate::error::Result;
use crate::schema::{ColumnDef, ColumnSpec};
use std::sync::Arc;

/// Header tag of the attack-label vocabulary.
pub const LABEL_TAG: u64 = 0x4142_524d_4643_4943;

/// Vocabulary name, as used in schema files.
pub const LABEL_VOCABULARY: &str = "cicfm_label";

/// Attack labels in code order.
pub const LABELS: [&str; 13] = [
    "BENIGN",
    "DrDoS_DNS",
    "DrDoS_MSSQL",
    "DrDoS_NTP",
    "DrDoS_SSDP",
    "Syn",
    "UDP-lag",
    "WebDDoS",
    "DrDoS_LDAP",
    "DrDoS_NetBIOS",
    "DrDoS_SNMP",
    "DrDoS_UDP",
    "TFTP",
];

#[derive(Clone, Copy)]
enum Kind {
    Skip,
    Real,
    Label,
}

use Kind::*;

const COLUMNS: [(&str, Kind); 88] = [
    ("Unnamed: 0", Skip),
    ("Flow ID", Skip),
    ("Source IP", Skip),
    ("Source Port", Real),
    ("Destination IP", Skip),
    ("Destination Port", Real),
    ("Protocol", Real),
    ("Timestamp", Skip),
    ("Flow Duration", Real),
    ("Total Fwd Packets", Real),
    ("Total Backward Packets", Real),
    ("Total Length of Fwd Packets", Real),
    ("Total Length of Bwd Packets", Real),
    ("Fwd Packet Length Max", Real),
    ("Fwd Packet Length Min", Real),
    ("Fwd Packet Length Mean", Real),
    ("Fwd Packet Length Std", Real),
    ("Bwd Packet Length Max", Real),
    ("Bwd Packet Length Min", Real),
    ("Bwd Packet Length Mean", Real),
    ("Bwd Packet Length Std", Real),
    ("Flow Bytes/s", Real),
    ("Flow Packets/s", Real),
    ("Flow IAT Mean", Real),
    ("Flow IAT Std", Real),
    ("Flow IAT Max", Real),
    ("Flow IAT Min", Real),
    ("Fwd IAT Total", Real),
    ("Fwd IAT Mean", Real),
    ("Fwd IAT Std", Real),
    ("Fwd IAT Max", Real),
    ("Fwd IAT Min", Real),
    ("Bwd IAT Total", Real),
    ("Bwd IAT Mean", Real),
    ("Bwd IAT Std", Real),
    ("Bwd IAT Max", Real),
    ("Bwd IAT Min", Real),
    ("Fwd PSH Flags", Real),
    ("Bwd PSH Flags", Real),
    ("Fwd URG Flags", Real),
    ("Bwd URG Flags", Real),
    ("Fwd Header Length", Real),
    ("Bwd Header Length", Real),
    ("Fwd Packets/s", Real),
    ("Bwd Packets/s", Real),
    ("Min Packet Length", Real),
    ("Max Packet Length", Real),
    ("Packet Length Mean", Real),
    ("Packet Length Std", Real),
    ("Packet Length Variance", Real),
    ("FIN Flag Count", Real),
    ("SYN Flag Count", Real),
    ("RST Flag Count", Real),
    ("PSH Flag Count", Real),
    ("ACK Flag Count", Real),
    ("URG Flag Count", Real),
    ("CWE Flag Count", Real),
    ("ECE Flag Count", Real),
    ("Down/Up Ratio", Real),
    ("Average Packet Size", Real),
    ("Avg Fwd Segment Size", Real),
    ("Avg Bwd Segment Size", Real),
    ("Fwd Header Length.1", Real),
    ("Fwd Avg Bytes/Bulk", Real),
    ("Fwd Avg Packets/Bulk", Real),
    ("Fwd Avg Bulk Rate", Real),
    ("Bwd Avg Bytes/Bulk", Real),
    ("Bwd Avg Packets/Bulk", Real),
    ("Bwd Avg Bulk Rate", Real),
    ("Subflow Fwd Packets", Real),
    ("Subflow Fwd Bytes", Real),
    ("Subflow Bwd Packets", Real),
    ("Subflow Bwd Bytes", Real),
    ("Init_Win_bytes_forward", Real),
    ("Init_Win_bytes_backward", Real),
    ("act_data_pkt_fwd", Real),
    ("min_seg_size_forward", Real),
    ("Active Mean", Real),
    ("Active Std", Real),
    ("Active Max", Real),
    ("Active Min", Real),
    ("Idle Mean", Real),
    ("Idle Std", Real),
    ("Idle Max", Real),
    ("Idle Min", Real),
    ("SimillarHTTP", Skip),
    ("Inbound", Real),
    ("Label", Label),
];

/// The attack-label vocabulary.
pub fn labels() -> Result<LabelSet> {
    LabelSet::new(LABEL_VOCABULARY, LABEL_TAG, LABELS)
}

/// The full 88-column specification.
pub fn spec() -> Result<ColumnSpec> {
    let label = Arc::new(labels()?);
    ColumnSpec::new(COLUMNS.iter().map(|&(name, kind)| {
        let ty = match kind {
            Skip => ColumnType::Ignore,
            Real => ColumnType::Float,
            Label => ColumnType::Label(Arc::clone(&label)),
        };
        ColumnDef::new(name, ty)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape() {
        let spec = spec().unwrap();
        assert_eq!(spec.len(), 88);
        // Unnamed: 0, Flow ID, Source IP, Destination IP, Timestamp, SimillarHTTP
        assert_eq!(spec.stored_columns(), 82);
        let last = spec.column(87).unwrap();
        assert_eq!(last.name, "Label");
        assert_eq!(last.ty.tag(), LABEL_TAG);
    }

    #[test]
    fn label_codes_follow_vocabulary_order() {
        let set = labels().unwrap();
        assert_eq!(set.code_of("BENIGN"), Some(0));
        assert_eq!(set.code_of("TFTP"), Some(12));
        assert_eq!(set.code_of("benign"), None);
    }
}
