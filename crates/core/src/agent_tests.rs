// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn builtin_catalog_has_the_four_builtins() {
    let catalog = AgentCatalog::builtin();
    for id in [AGENT_COMPACT, AGENT_PLAN, AGENT_EXEC, AGENT_ORCHESTRATOR] {
        assert!(catalog.contains(id), "missing builtin {id}");
    }
}

#[test]
fn normalization_is_case_insensitive() {
    let catalog = AgentCatalog::builtin();
    assert!(catalog.contains("  Exec "));
    assert!(catalog.contains("PLAN"));
}

#[test]
fn plan_like_resolves_through_inherit_chain() {
    let catalog = AgentCatalog::builtin()
        .with_agent(AgentDef::new("architect").inherits("plan"))
        .with_agent(AgentDef::new("senior-architect").inherits("architect"));

    assert!(catalog.is_plan_like("plan"));
    assert!(catalog.is_plan_like("architect"));
    assert!(catalog.is_plan_like("senior-architect"));
    assert!(!catalog.is_plan_like("exec"));
    assert!(!catalog.is_plan_like("unknown"));
}

#[test]
fn inherit_cycle_is_not_plan_like() {
    let catalog = AgentCatalog::builtin()
        .with_agent(AgentDef::new("a").inherits("b"))
        .with_agent(AgentDef::new("b").inherits("a"));
    assert!(!catalog.is_plan_like("a"));
}

#[test]
fn completion_tool_depends_on_plan_likeness() {
    let catalog = AgentCatalog::builtin();
    assert_eq!(catalog.completion_tool("exec"), TOOL_AGENT_REPORT);
    assert_eq!(catalog.completion_tool("plan"), TOOL_PROPOSE_PLAN);
}

#[test]
fn compact_skips_workspace_init() {
    let catalog = AgentCatalog::builtin();
    assert!(catalog.skip_workspace_init("compact"));
    assert!(!catalog.skip_workspace_init("exec"));
}

#[test]
fn orchestrator_can_be_disabled() {
    let catalog = AgentCatalog::builtin().without_agent("orchestrator");
    assert!(!catalog.has_orchestrator());
}

#[parameterized(
    plain = { "anthropic:claude-sonnet-4-5", true },
    openai = { "openai:gpt-5", true },
    missing_model = { "anthropic:", false },
    missing_provider = { ":claude", false },
    no_separator = { "claude", false },
    empty = { "", false },
)]
fn model_string_validation(input: &str, ok: bool) {
    assert_eq!(validate_model_string(input).is_ok(), ok);
}

#[test]
fn thinking_level_serde_is_lowercase() {
    assert_eq!(serde_json::to_string(&ThinkingLevel::High).unwrap(), "\"high\"");
    let level: ThinkingLevel = serde_json::from_str("\"off\"").unwrap();
    assert_eq!(level, ThinkingLevel::Off);
}
