use crate::yaml::{self, Mapping, YamlValue};

use super::format_version_tuple;

const DOI_PREFIXES: &[&str] = &["https://doi.org/", "http://dx.doi.org/"];
const GITHUB_PREFIX: &str = "https://github.com/";

/// Chain of generic upgrades 0.2.0 -> ... -> 0.2.4.
pub fn upgrade_generic_within_0_2(data: &mut Mapping) {
    let Some((major, minor, _)) = format_version_tuple(data) else {
        return;
    };
    if (major, minor) > (0, 2) {
        return;
    }

    promote_author_strings(data);

    if matches!(yaml::get_str(data, "format_version"), Some("0.2.0") | Some("0.2.1")) {
        yaml::insert(data, "format_version", YamlValue::String("0.2.2".into()));
    }

    if yaml::get_str(data, "format_version") == Some("0.2.2") {
        remove_slashes_from_names(data);
        yaml::insert(data, "format_version", YamlValue::String("0.2.3".into()));
    }

    if yaml::get_str(data, "format_version") == Some("0.2.3") {
        promote_config_nickname(data);
        yaml::insert(data, "format_version", YamlValue::String("0.2.4".into()));
    }

    remove_doi_prefix(data);
    remove_github_prefix(data);
}

/// Generic (and application/dataset/notebook) 0.2.x -> 0.3.0.
pub fn upgrade_generic_to_0_3(data: &mut Mapping) {
    let Some((major, minor, _)) = format_version_tuple(data) else {
        return;
    };
    if (major, minor) > (0, 3) {
        return;
    }
    if (major, minor) == (0, 3) {
        return;
    }

    upgrade_generic_within_0_2(data);
    convert_attachments(data);
    let _ = yaml::remove(data, "download_url");
    yaml::insert(data, "format_version", YamlValue::String("0.3.0".into()));
}

/// Author entries given as bare strings become `{name: ...}` objects.
fn promote_author_strings(data: &mut Mapping) {
    for field in ["authors", "packaged_by"] {
        let Some(YamlValue::Sequence(authors)) = yaml::get(data, field).cloned() else {
            continue;
        };
        let promoted: Vec<YamlValue> = authors
            .into_iter()
            .map(|author| match author {
                YamlValue::String(name) => {
                    let mut person = Mapping::new();
                    yaml::insert(&mut person, "name", YamlValue::String(name));
                    YamlValue::Mapping(person)
                }
                other => other,
            })
            .collect();
        yaml::insert(data, field, YamlValue::Sequence(promoted));
    }
}

/// Slashes are removed from the resource name and all person names.
pub(crate) fn remove_slashes_from_names(data: &mut Mapping) {
    if let Some(YamlValue::String(name)) = yaml::get(data, "name") {
        let cleaned = name.replace(['/', '\\'], "");
        yaml::insert(data, "name", YamlValue::String(cleaned));
    }

    for group in ["authors", "maintainers"] {
        let Some(YamlValue::Sequence(persons)) = yaml::get(data, group).cloned() else {
            continue;
        };
        let cleaned: Vec<YamlValue> = persons
            .into_iter()
            .map(|person| match person {
                YamlValue::Mapping(mut map) => {
                    if let Some(YamlValue::String(name)) = yaml::get(&map, "name") {
                        let cleaned = name.replace(['/', '\\'], "");
                        yaml::insert(&mut map, "name", YamlValue::String(cleaned));
                    }
                    YamlValue::Mapping(map)
                }
                other => other,
            })
            .collect();
        yaml::insert(data, group, YamlValue::Sequence(cleaned));
    }
}

/// `config.bioimageio.nickname` and `nickname_icon` move to `id`/`id_emoji`.
fn promote_config_nickname(data: &mut Mapping) {
    let Some(YamlValue::Mapping(config)) = yaml::get(data, "config") else {
        return;
    };
    let Some(YamlValue::Mapping(bioimageio)) = yaml::get(config, "bioimageio") else {
        return;
    };
    let nickname = yaml::get(bioimageio, "nickname").cloned();
    let nickname_icon = yaml::get(bioimageio, "nickname_icon").cloned();
    if let Some(nickname) = nickname {
        yaml::insert(data, "id", nickname);
    }
    if let Some(nickname_icon) = nickname_icon {
        yaml::insert(data, "id_emoji", nickname_icon);
    }
}

/// DOIs given as resolver URLs are reduced to the plain DOI.
pub(crate) fn remove_doi_prefix(data: &mut Mapping) {
    let Some(YamlValue::Sequence(cite)) = yaml::get(data, "cite").cloned() else {
        return;
    };
    let cleaned: Vec<YamlValue> = cite
        .into_iter()
        .map(|entry| match entry {
            YamlValue::Mapping(mut map) => {
                if let Some(YamlValue::String(doi)) = yaml::get(&map, "doi") {
                    for prefix in DOI_PREFIXES {
                        if let Some(stripped) = doi.strip_prefix(prefix) {
                            let stripped = stripped.to_owned();
                            yaml::insert(&mut map, "doi", YamlValue::String(stripped));
                            break;
                        }
                    }
                }
                YamlValue::Mapping(map)
            }
            other => other,
        })
        .collect();
    yaml::insert(data, "cite", YamlValue::Sequence(cleaned));
}

/// Github user names given as profile URLs are reduced to the user name.
pub(crate) fn remove_github_prefix(data: &mut Mapping) {
    for group in ["authors", "maintainers"] {
        let Some(YamlValue::Sequence(persons)) = yaml::get(data, group).cloned() else {
            continue;
        };
        let cleaned: Vec<YamlValue> = persons
            .into_iter()
            .map(|person| match person {
                YamlValue::Mapping(mut map) => {
                    if let Some(YamlValue::String(user)) = yaml::get(&map, "github_user") {
                        if let Some(stripped) = user.strip_prefix(GITHUB_PREFIX) {
                            let stripped = stripped.to_owned();
                            yaml::insert(&mut map, "github_user", YamlValue::String(stripped));
                        }
                    }
                    YamlValue::Mapping(map)
                }
                other => other,
            })
            .collect();
        yaml::insert(data, group, YamlValue::Sequence(cleaned));
    }
}

/// `attachments: {files: [...]}` becomes a list of `{source}` objects.
pub(crate) fn convert_attachments(data: &mut Mapping) {
    let Some(YamlValue::Mapping(attachments)) = yaml::get(data, "attachments") else {
        return;
    };
    let files = match yaml::get(attachments, "files") {
        Some(YamlValue::Sequence(files)) => files.clone(),
        _ => Vec::new(),
    };
    let converted: Vec<YamlValue> = files
        .into_iter()
        .map(|file| {
            let mut descr = Mapping::new();
            yaml::insert(&mut descr, "source", file);
            YamlValue::Mapping(descr)
        })
        .collect();
    yaml::insert(data, "attachments", YamlValue::Sequence(converted));
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    fn parse(raw: &str) -> Mapping {
        serde_yaml::from_str(raw).unwrap()
    }

    #[test]
    fn test_author_strings_and_doi_prefix() {
        let mut data = parse(indoc! {"
            format_version: 0.2.2
            name: my/resource
            authors: [Jane Doe, {name: John, github_user: 'https://github.com/john'}]
            cite:
              - {text: paper, doi: 'https://doi.org/10.1234/abc'}
        "});
        upgrade_generic_within_0_2(&mut data);

        assert_eq!(yaml::get_str(&data, "format_version"), Some("0.2.4"));
        assert_eq!(yaml::get_str(&data, "name"), Some("myresource"));

        let YamlValue::Sequence(authors) = yaml::get(&data, "authors").unwrap() else {
            panic!("authors must stay a list");
        };
        assert_eq!(authors[0], YamlValue::Mapping(parse("{name: Jane Doe}")));
        let YamlValue::Mapping(second) = &authors[1] else {
            panic!("author objects stay objects");
        };
        assert_eq!(yaml::get_str(second, "github_user"), Some("john"));

        let YamlValue::Sequence(cite) = yaml::get(&data, "cite").unwrap() else {
            panic!("cite must stay a list");
        };
        let YamlValue::Mapping(entry) = &cite[0] else {
            panic!("cite entries stay objects");
        };
        assert_eq!(yaml::get_str(entry, "doi"), Some("10.1234/abc"));
    }

    #[test]
    fn test_attachment_files_conversion() {
        let mut data = parse(indoc! {"
            format_version: 0.2.4
            attachments:
              files: [a.txt, b.txt]
            download_url: https://example.com/download
        "});
        upgrade_generic_to_0_3(&mut data);

        assert_eq!(yaml::get_str(&data, "format_version"), Some("0.3.0"));
        assert!(yaml::get(&data, "download_url").is_none());
        let YamlValue::Sequence(attachments) = yaml::get(&data, "attachments").unwrap() else {
            panic!("attachments must become a list");
        };
        assert_eq!(attachments.len(), 2);
        let YamlValue::Mapping(first) = &attachments[0] else {
            panic!("attachment entries are objects");
        };
        assert_eq!(yaml::get_str(first, "source"), Some("a.txt"));
    }

    #[test]
    fn test_nickname_promotion() {
        let mut data = parse(indoc! {"
            format_version: 0.2.3
            config:
              bioimageio:
                nickname: affable-shark
                nickname_icon: \"\u{1F988}\"
        "});
        upgrade_generic_within_0_2(&mut data);
        assert_eq!(yaml::get_str(&data, "id"), Some("affable-shark"));
        assert!(yaml::get(&data, "id_emoji").is_some());
    }
}
