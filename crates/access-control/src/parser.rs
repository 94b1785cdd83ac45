//! Decoders for the files of the GPD access-control chain
//!
//! Each function takes the raw content of one file and extracts what the next
//! stage needs. Shapes that do not follow the GPD layout are reported as
//! [`Error::UnexpectedStructure`]; the walker turns those into an empty rule set.

use gpac_apdu_core::tlv::{TlvNode, decode_file, decode_tlv};

use crate::constants::{ids, tags};
use crate::error::{Error, Result};
use crate::rules::{Aid, AppletSelector, ApplicationSelector, CertificateHash, FileId, RefreshTag};

/// Content of the access-control main file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcmfContent {
    /// Tag that changes whenever the rules change
    pub refresh_tag: RefreshTag,
    /// File holding the ACRules
    pub rules_file: FileId,
}

fn primitive<'a>(node: Option<&'a TlvNode>, what: &'static str) -> Result<&'a [u8]> {
    node.and_then(TlvNode::bytes)
        .map(|b| b.as_ref())
        .ok_or(Error::UnexpectedStructure(what))
}

/// Number of data bytes in the EF described by a SELECT response
pub fn file_size(fcp: &[u8]) -> Result<usize> {
    let template = decode_tlv(fcp)?;
    if !matches!(template.tag(), tags::FCP | tags::FCI) {
        return Err(Error::UnexpectedStructure("SELECT response is not an FCP template"));
    }

    let size = primitive(template.child(tags::FILE_SIZE), "FCP without file size")?;
    if size.is_empty() || size.len() > 4 {
        return Err(Error::UnexpectedStructure("FCP file size has an invalid length"));
    }
    Ok(size.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b)))
}

/// DODF location from the ODF
pub fn parse_odf(data: &[u8]) -> Result<FileId> {
    let nodes = decode_file(data)?;
    let entry = nodes
        .iter()
        .find(|n| n.tag() == tags::ODF_DODF)
        .ok_or(Error::UnexpectedStructure("ODF has no DODF entry"))?;

    let path = primitive(
        entry.child(tags::SEQUENCE).and_then(|p| p.child(tags::OCTET_STRING)),
        "ODF DODF entry without path",
    )?;
    FileId::from_path(path)
}

/// ACMF locations of every GPD access-control entry in the DODF
///
/// Entries for other OIDs are skipped. The result is empty when the card does
/// not implement GPD access control.
pub fn parse_dodf(data: &[u8]) -> Result<Vec<FileId>> {
    let mut files = Vec::new();
    for entry in decode_file(data)?.iter().filter(|n| n.tag() == tags::DODF_OID_DO) {
        let Some(value) = entry
            .child(tags::DODF_OID_DO)
            .and_then(|attrs| attrs.child(tags::SEQUENCE))
        else {
            continue;
        };

        let is_gpd = value
            .child(tags::OID)
            .and_then(TlvNode::bytes)
            .is_some_and(|oid| oid[..] == ids::GPD_AC_OID);
        if !is_gpd {
            continue;
        }

        let path = primitive(
            value.child(tags::SEQUENCE).and_then(|p| p.child(tags::OCTET_STRING)),
            "GPD DODF entry without ACMF path",
        )?;
        files.push(FileId::from_path(path)?);
    }
    Ok(files)
}

/// Refresh tag and ACRules location from the ACMF
pub fn parse_acmf(data: &[u8]) -> Result<AcmfContent> {
    let nodes = decode_file(data)?;
    let main = match nodes.as_slice() {
        [main] if main.tag() == tags::SEQUENCE => main,
        _ => return Err(Error::UnexpectedStructure("ACMF is not a single sequence")),
    };

    let refresh_tag = primitive(main.child(tags::OCTET_STRING), "ACMF without refresh tag")?;
    let path = primitive(
        main.child(tags::SEQUENCE).and_then(|p| p.child(tags::OCTET_STRING)),
        "ACMF without ACRules path",
    )?;

    Ok(AcmfContent {
        refresh_tag: RefreshTag::try_from(refresh_tag)?,
        rules_file: FileId::from_path(path)?,
    })
}

fn parse_target(target: &TlvNode) -> Result<AppletSelector> {
    match target.tag() {
        tags::TARGET_AID => {
            let aid = primitive(target.child(tags::OCTET_STRING), "AID target without AID")?;
            Ok(AppletSelector::Specific(Aid::new(aid.to_vec())?))
        }
        tags::TARGET_ALL | tags::TARGET_DEFAULT => Ok(AppletSelector::AllApplets),
        _ => Err(Error::UnexpectedStructure("unknown ACRules target")),
    }
}

/// Applet selectors and their condition files from ACRules, in file order
pub fn parse_acrules(data: &[u8]) -> Result<Vec<(AppletSelector, FileId)>> {
    decode_file(data)?
        .iter()
        .map(|entry| {
            let [target, condition] = entry.children() else {
                return Err(Error::UnexpectedStructure("ACRules entry is not a target and a path"));
            };
            if entry.tag() != tags::SEQUENCE || condition.tag() != tags::SEQUENCE {
                return Err(Error::UnexpectedStructure("ACRules entry is not a sequence"));
            }

            let path = primitive(
                condition.child(tags::OCTET_STRING),
                "ACRules entry without path",
            )?;
            Ok((parse_target(target)?, FileId::from_path(path)?))
        })
        .collect()
}

/// Applications granted by an ACCondition file
///
/// An empty file grants nothing. When entries are mixed, an unrestricted entry
/// wins over certificate hashes, and hashes win over an explicit denial.
pub fn parse_condition(data: &[u8]) -> Result<ApplicationSelector> {
    let mut allow_all = false;
    let mut hashes = Vec::new();

    for entry in decode_file(data)? {
        if entry.tag() != tags::SEQUENCE {
            return Err(Error::UnexpectedStructure("ACCondition entry is not a sequence"));
        }
        if entry.children().is_empty() {
            allow_all = true;
        }
        for child in entry.children() {
            match (child.tag(), child.bytes()) {
                (tags::OCTET_STRING, Some(hash)) => hashes.push(CertificateHash::new(hash.clone())),
                (tags::TARGET_ALL, _) => {}
                // APDU and NFC event filters among others
                _ => return Err(Error::UnexpectedStructure("unsupported access condition")),
            }
        }
    }

    Ok(if allow_all {
        ApplicationSelector::AllowAll
    } else if !hashes.is_empty() {
        ApplicationSelector::hashes(hashes)
    } else {
        ApplicationSelector::DenyAll
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const DODF_GPD: [u8; 43] = hex!(
        "A129 3000 300F 0C0D 4750205345204163632043746C"
        "A114 3012 060A 2A864886FC6B81480101 3004 04024200"
    );

    #[test]
    fn test_file_size() {
        let fcp = hex!(
            "6222 82024121 83025031 A503C00140 8A0105 8B066F0601010001"
            "80020010 81020022 8800"
        );
        assert_eq!(file_size(&fcp).unwrap(), 0x10);
        assert_eq!(file_size(&hex!("6F03 800100")).unwrap(), 0);
        assert!(matches!(
            file_size(&hex!("6203 830150")),
            Err(Error::UnexpectedStructure(_))
        ));
        assert!(matches!(file_size(&hex!("A503 800100")), Err(Error::UnexpectedStructure(_))));
        assert!(matches!(file_size(&hex!("6281")), Err(Error::MalformedTlv(_))));
    }

    #[test]
    fn test_parse_odf() {
        assert_eq!(parse_odf(&hex!("A706 3004 04025207")).unwrap(), FileId::new([0x52, 0x07]));
        // Other directory entries first, then padding
        assert_eq!(
            parse_odf(&hex!("A806 3004 04024401 A708 3006 04043F005207 FFFF")).unwrap(),
            FileId::new([0x52, 0x07])
        );
        assert!(parse_odf(&hex!("A806 3004 04024401")).is_err());
    }

    #[test]
    fn test_parse_dodf() {
        assert_eq!(parse_dodf(&DODF_GPD).unwrap(), vec![FileId::new([0x42, 0x00])]);

        let mut twice = DODF_GPD.to_vec();
        twice.extend_from_slice(&DODF_GPD);
        assert_eq!(parse_dodf(&twice).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_dodf_other_oid() {
        // Same layout, different OID in the last byte
        let mut other = DODF_GPD;
        other[36] = 0x02;
        assert!(parse_dodf(&other).unwrap().is_empty());
        assert!(parse_dodf(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_acmf() {
        let acmf = parse_acmf(&hex!("3010 0408 0102030405060708 3004 04024300")).unwrap();
        assert_eq!(acmf.refresh_tag, RefreshTag::new(hex!("0102030405060708")));
        assert_eq!(acmf.rules_file, FileId::new([0x43, 0x00]));

        assert!(parse_acmf(&hex!("300C 0404 01020304 3004 04024300")).is_err());
        assert!(parse_acmf(&hex!("300A 0408 0102030405060708")).is_err());
    }

    #[test]
    fn test_parse_acrules() {
        let rules = parse_acrules(&hex!(
            "3010 A008 0406A00000015101 3004 04024310"
            "3008 8200 3004 04024312"
            "3008 8100 3004 04024313"
        ))
        .unwrap();

        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules[0],
            (
                AppletSelector::Specific(Aid::new(hex!("A00000015101").to_vec()).unwrap()),
                FileId::new([0x43, 0x10])
            )
        );
        assert_eq!(rules[1], (AppletSelector::AllApplets, FileId::new([0x43, 0x12])));
        assert_eq!(rules[2].0, AppletSelector::AllApplets);
    }

    #[test]
    fn test_parse_acrules_rejects_unknown_target() {
        assert!(parse_acrules(&hex!("3008 8300 3004 04024312")).is_err());
        assert!(parse_acrules(&hex!("3004 8200 3000")).is_err());
    }

    #[test]
    fn test_parse_condition() {
        let h1 = CertificateHash::new(vec![0x11u8; 20]);
        let h2 = CertificateHash::new(vec![0x22u8; 20]);

        assert_eq!(parse_condition(&[]).unwrap(), ApplicationSelector::DenyAll);
        assert_eq!(parse_condition(&hex!("FFFF")).unwrap(), ApplicationSelector::DenyAll);
        assert_eq!(parse_condition(&hex!("3000")).unwrap(), ApplicationSelector::AllowAll);

        let mut two = hex!("3016 0414 1111111111111111111111111111111111111111").to_vec();
        two.extend_from_slice(&hex!("3016 0414 2222222222222222222222222222222222222222"));
        assert_eq!(
            parse_condition(&two).unwrap(),
            ApplicationSelector::Hashes(vec![h1.clone(), h2])
        );

        // An unrestricted entry wins over hashes
        let mut mixed = two.clone();
        mixed.extend_from_slice(&hex!("3000"));
        assert_eq!(parse_condition(&mixed).unwrap(), ApplicationSelector::AllowAll);

        // Hashes win over an explicit denial
        let mut denied = hex!("3002 8200").to_vec();
        assert_eq!(parse_condition(&denied).unwrap(), ApplicationSelector::DenyAll);
        denied.extend_from_slice(&hex!("3016 0414 1111111111111111111111111111111111111111"));
        assert_eq!(parse_condition(&denied).unwrap(), ApplicationSelector::Hashes(vec![h1]));
    }

    #[test]
    fn test_parse_condition_rejects_filters() {
        // Hash with an APDU filter
        let filtered = hex!(
            "3024 0414 1111111111111111111111111111111111111111"
            "A00C 810A 00A4040000FFFFFF0000"
        );
        assert!(matches!(parse_condition(&filtered), Err(Error::UnexpectedStructure(_))));
    }
}
