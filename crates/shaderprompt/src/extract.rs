const GLSL_FENCE: &str = "```glsl";
const CLOSING_FENCE: &str = "```";

/// Unwraps the first ```` ```glsl ```` fenced block in `text`.
///
/// Returns the trimmed interior of the block when an opening `glsl` fence is
/// followed by a closing fence, otherwise the trimmed input. The transform is
/// total and idempotent: the interior never contains a fence, so a second
/// pass falls through to trimming an already trimmed string.
pub fn extract_glsl_code(text: &str) -> String {
    if let Some(start) = text.find(GLSL_FENCE) {
        let body = &text[start + GLSL_FENCE.len()..];
        if let Some(end) = body.find(CLOSING_FENCE) {
            return body[..end].trim().to_string();
        }
    }
    text.trim().to_string()
}

/// Reports whether `code` declares a `void main(` entry point.
pub fn declares_entry_point(code: &str) -> bool {
    code.match_indices("main").any(|(index, name)| {
        let prefix = &code[..index];
        let before = prefix.trim_end();
        let after = code[index + name.len()..].trim_start();
        let separated = before.len() < prefix.len();
        let Some(head) = before.strip_suffix("void") else {
            return false;
        };
        let standalone = !head.ends_with(|ch: char| ch.is_ascii_alphanumeric() || ch == '_');
        separated && standalone && after.starts_with('(')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_fenced_glsl_block() {
        let text = "```glsl\nvoid main(){gl_FragColor=vec4(1,0,0,1);}\n```";
        assert_eq!(
            extract_glsl_code(text),
            "void main(){gl_FragColor=vec4(1,0,0,1);}"
        );
    }

    #[test]
    fn ignores_prose_around_the_block() {
        let text = "Here is your shader:\n\n```glsl\n  precision mediump float;\nvoid main() {}\n```\nEnjoy!";
        assert_eq!(
            extract_glsl_code(text),
            "precision mediump float;\nvoid main() {}"
        );
    }

    #[test]
    fn takes_the_first_block_only() {
        let text = "```glsl\nfirst\n```\n```glsl\nsecond\n```";
        assert_eq!(extract_glsl_code(text), "first");
    }

    #[test]
    fn falls_back_to_trimmed_input() {
        assert_eq!(extract_glsl_code("  void main() {}\n"), "void main() {}");
        assert_eq!(extract_glsl_code(""), "");
        assert_eq!(extract_glsl_code("   \n\t"), "");
        // Fences tagged with another language are not unwrapped.
        assert_eq!(
            extract_glsl_code("```wgsl\nfn main() {}\n```"),
            "```wgsl\nfn main() {}\n```"
        );
        // An unterminated fence is passed through.
        assert_eq!(
            extract_glsl_code("```glsl\nvoid main() {}"),
            "```glsl\nvoid main() {}"
        );
    }

    #[test]
    fn empty_block_yields_empty_string() {
        assert_eq!(extract_glsl_code("```glsl```"), "");
        assert_eq!(extract_glsl_code("```glsl\n\n```"), "");
    }

    #[test]
    fn extraction_is_idempotent() {
        let samples = [
            "```glsl\nvoid main(){}\n```",
            "prose ```glsl  code  ``` tail",
            "  plain text  ",
            "```glsl\nunterminated",
            "```\nuntagged\n```",
            "",
        ];
        for sample in samples {
            let once = extract_glsl_code(sample);
            assert_eq!(extract_glsl_code(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn detects_entry_point() {
        assert!(declares_entry_point("void main(){}"));
        assert!(declares_entry_point("uniform float u_time;\nvoid   main ( ) {}"));
        assert!(!declares_entry_point("void mainImage(out vec4 c, in vec2 p) {}"));
        assert!(!declares_entry_point("voidmain() {}"));
        assert!(!declares_entry_point("Sure! A red background looks great."));
        assert!(!declares_entry_point("int_void main() {}"));
    }
}
